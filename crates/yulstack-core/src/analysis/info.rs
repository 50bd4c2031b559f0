use indexmap::IndexSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<String>,
    pub returns: Vec<String>,
}

/// What a successful analysis learned about one object's code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnalysisInfo {
    /// User-defined functions in declaration order.
    pub functions: Vec<FunctionSignature>,
    pub variable_count: usize,
    pub max_scope_depth: usize,
    /// Objects and data entries named by `datasize`/`dataoffset`, in first-use order.
    pub data_references: IndexSet<String>,
}

impl AnalysisInfo {
    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.iter().find(|signature| signature.name == name)
    }
}
