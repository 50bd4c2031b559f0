/*! Core data model for the Yul assembly stack.
 *
 * A compilation job moves a tree of Yul objects through parsing, analysis, optimisation and
 * code generation. This crate holds the pieces every stage shares: the object arena and AST,
 * the dialect tables, diagnostics, the reference analyzer, the assembly interfaces that
 * backends implement and the helper-function collector used while lowering.
 */

pub mod analysis;
pub mod assembly;
pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod dialect;
pub mod object;
pub mod settings;
pub mod source_location;

pub use analysis::{AnalysisInfo, AsmAnalyzer, FunctionSignature};
pub use assembly::{
    compute_source_mapping, AssemblyItem, AssemblyItemKind, JumpType, LinkableAssembly,
    LinkerObject, MachineAssemblyObject,
};
pub use ast::{Block, Expression, Statement};
pub use codegen::{CollectorError, MultiUseFunctionCollector};
pub use diagnostics::{Diagnostic, DiagnosticKind, ErrorReporter};
pub use dialect::{
    language_to_dialect, BuiltinFunction, Dialect, EvmDialect, EvmVersion, Language, WasmDialect,
};
pub use object::{Data, NodeId, Object, ObjectNode, ObjectTree};
pub use settings::OptimiserSettings;
pub use source_location::{CharStream, SourceLocation};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),
    #[error("Unknown EVM version: {0}")]
    UnknownEvmVersion(String),
    #[error("Node {0} does not exist or is not an object")]
    InvalidNode(NodeId),
    #[error("Object {0} has no code")]
    MissingCode(String),
    #[error("Invalid optimiser settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
