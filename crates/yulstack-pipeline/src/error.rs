use crate::collaborators::BoxError;
use crate::stack::Machine;
use std::fmt;
use thiserror::Error;
use yulstack_core::{CoreError, Language};

/// Pipeline stage, used to name the collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parse,
    Analyze,
    Optimize,
    Translate,
    EvmCodegen,
    WasmCodegen,
    Print,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Analyze => "analyze",
            Stage::Optimize => "optimize",
            Stage::Translate => "translate",
            Stage::EvmCodegen => "EVM code generation",
            Stage::WasmCodegen => "Ewasm code generation",
            Stage::Print => "print",
        };
        f.write_str(name)
    }
}

/// Internal errors of a compilation job. Problems in the user's source are diagnostics, never
/// one of these.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Analysis was not successful")]
    AnalysisRequired,

    #[error("Invalid source code after optimization")]
    OptimizedCodeInvalid,

    #[error("Invalid language combination: {current} to {target}")]
    InvalidLanguageCombination { current: Language, target: Language },

    #[error("Invalid language for EVM code generation: {0}")]
    InvalidLanguage(Language),

    #[error("Cannot assemble {language} code for {machine:?}")]
    MachineLanguageMismatch { machine: Machine, language: Language },

    #[error("Failed to find object to be deployed: {0}")]
    DeployedObjectNotFound(String),

    #[error("Leftover immutables: {}", .0.join(", "))]
    LeftoverImmutables(Vec<String>),

    #[error("No parser result available")]
    MissingParserResult,

    #[error("Object {0} has no code")]
    MissingCode(String),

    #[error("Object {0} has no analysis information")]
    MissingAnalysisInfo(String),

    #[error("No collaborator installed for {0}")]
    MissingCollaborator(Stage),

    #[error("No source has been parsed")]
    NoSource,

    #[error("{stage} failed: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StackError {
    pub(crate) fn backend(stage: Stage) -> impl FnOnce(BoxError) -> StackError {
        move |source| StackError::Backend { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
