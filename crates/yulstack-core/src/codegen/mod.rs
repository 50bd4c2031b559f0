/*! Helpers for code generators that emit Yul text.
 *
 * Lowering code often needs the same runtime routine (a checked addition, a memory copy) at
 * many call sites. The `MultiUseFunctionCollector` makes sure each such routine is generated
 * and emitted exactly once per lowering phase.
 */

pub mod function_collector;

pub use function_collector::{
    CollectorError, MultiUseFunctionCollector, SOURCE_LOCATION_TAG, MAX_GENERATION_DEPTH,
};
