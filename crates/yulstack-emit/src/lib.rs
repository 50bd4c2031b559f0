/*! Turn object trees and diagnostics back into text.
 *
 * The printer output is deterministic: printing the same tree twice yields the same bytes, and
 * re-parsing printed code yields an equivalent tree. Default types are left out so that untyped
 * code prints the way it was written.
 */

pub mod config;
pub mod diagnostics;
pub mod emitter;
pub mod yul_printer;

pub use config::{IndentStyle, PrinterConfig, TypeAnnotations};
pub use diagnostics::DiagnosticRenderer;
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use yul_printer::YulPrinter;
