/*! Semantic analysis of Yul code.
 *
 * The analyzer checks one object's code against a dialect and records what later stages need
 * to know about it. It reports every problem it finds instead of stopping at the first one, so a
 * single run yields the complete list of diagnostics.
 */

pub mod analyzer;
pub mod info;
pub mod scope;

pub use analyzer::{literal_value, AsmAnalyzer};
pub use info::{AnalysisInfo, FunctionSignature};
pub use scope::{Lookup, Scope, ScopeStack, Symbol};
