/*! Yul assembly stack.
 *
 * One import for the whole stack: build an `AssemblyStack` for a language and EVM version, feed
 * it source, and walk it through analysis, optimisation, translation and assembly. Code generators
 * that emit Yul use `MultiUseFunctionCollector` to share helper functions between call sites.
 */

pub use yulstack_core as core;
pub use yulstack_emit as emit;
pub use yulstack_parser as parser;
pub use yulstack_pipeline as pipeline;

pub use yulstack_core::{
    language_to_dialect, CharStream, CollectorError, Diagnostic, DiagnosticKind, Dialect,
    ErrorReporter, EvmVersion, Language, LinkableAssembly, LinkerObject, MachineAssemblyObject,
    MultiUseFunctionCollector, ObjectTree, OptimiserSettings, SourceLocation,
};

pub use yulstack_emit::{DiagnosticRenderer, Emitter, YulPrinter};

pub use yulstack_parser::YulObjectParser;

pub use yulstack_pipeline::{AssemblyStack, Machine, StackError};
