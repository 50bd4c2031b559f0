//! Seams between the stack and the components it drives.

use crate::gas_meter::GasMeter;
use std::collections::BTreeSet;
use yulstack_core::{
    AnalysisInfo, AsmAnalyzer, Block, CharStream, Dialect, ErrorReporter, LinkableAssembly,
    Object, ObjectTree,
};
use yulstack_parser::YulObjectParser;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub trait ObjectParser {
    /// Returns `None` only after reporting at least one diagnostic.
    fn parse(
        &self,
        stream: &CharStream,
        dialect: Dialect,
        reporter: &mut ErrorReporter,
    ) -> Option<ObjectTree>;
}

pub trait Analyzer {
    /// Returns `None` if any error was reported for `code`.
    fn analyze(
        &self,
        code: &Block,
        dialect: Dialect,
        data_names: &BTreeSet<String>,
        reporter: &mut ErrorReporter,
    ) -> Option<AnalysisInfo>;
}

/// Everything the optimiser suite gets for one object.
pub struct OptimiserRun<'a> {
    pub dialect: Dialect,
    /// Present for EVM dialects only.
    pub meter: Option<&'a GasMeter>,
    pub object: &'a mut Object,
    pub data_names: &'a BTreeSet<String>,
    pub is_creation: bool,
    pub optimize_stack_allocation: bool,
    pub steps: &'a [String],
    /// Absent for the creation object.
    pub expected_executions: Option<usize>,
}

pub trait OptimiserSuite {
    fn run(&self, run: OptimiserRun<'_>) -> Result<(), BoxError>;
}

pub trait Translator {
    /// The returned tree must carry analysis information for every object.
    fn translate(&self, tree: &ObjectTree, source_dialect: Dialect)
        -> Result<ObjectTree, BoxError>;
}

pub trait EvmObjectCompiler {
    fn compile(
        &self,
        tree: &ObjectTree,
        dialect: Dialect,
        optimize: bool,
    ) -> Result<Box<dyn LinkableAssembly>, BoxError>;
}

pub trait WasmObjectCompiler {
    /// Returns the textual module and the binary.
    fn compile(&self, tree: &ObjectTree, dialect: Dialect) -> Result<(String, Vec<u8>), BoxError>;
}

impl ObjectParser for YulObjectParser {
    fn parse(
        &self,
        stream: &CharStream,
        dialect: Dialect,
        reporter: &mut ErrorReporter,
    ) -> Option<ObjectTree> {
        YulObjectParser::parse(self, stream, dialect, reporter)
    }
}

impl Analyzer for AsmAnalyzer {
    fn analyze(
        &self,
        code: &Block,
        dialect: Dialect,
        data_names: &BTreeSet<String>,
        reporter: &mut ErrorReporter,
    ) -> Option<AnalysisInfo> {
        AsmAnalyzer::analyze(self, code, dialect, data_names, reporter)
    }
}
