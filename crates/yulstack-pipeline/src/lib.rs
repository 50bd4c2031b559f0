/*! Staged compilation of Yul objects.
 *
 * `AssemblyStack` owns one compilation job. Stages are called in order: parse and analyze,
 * optionally optimise (children before parents, then re-analyze), optionally translate to Ewasm,
 * then assemble into machine artifacts or print the tree back as source. User mistakes end up in
 * the job's diagnostics; calling a stage out of order or breaking an internal invariant is a
 * `StackError`.
 *
 * Parsing and analysis use the reference implementations by default. The optimiser suite, the
 * translator and both backends are pluggable through the traits in `collaborators`.
 */

pub mod collaborators;
pub mod error;
pub mod gas_meter;
pub mod stack;

pub use collaborators::{
    Analyzer, BoxError, EvmObjectCompiler, ObjectParser, OptimiserRun, OptimiserSuite,
    Translator, WasmObjectCompiler,
};
pub use error::{Result, Stage, StackError};
pub use gas_meter::GasMeter;
pub use stack::{AssemblyStack, Machine};
