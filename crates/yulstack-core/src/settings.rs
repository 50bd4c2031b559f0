use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Step sequence of the default optimiser run, passed through to the suite unchanged.
pub const DEFAULT_OPTIMISER_STEPS: &str = "dhfoDgvulfnTUtnIf[xa[r]EscLMcCTUtTOntnfDIulLculVcul[j]Tpeulxa[rul]xa[r]cLgvifCTUca[r]LSsTOtfDnca[r]Iulc]jmul[jul]VcTOculjmul";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimiserSettings {
    #[serde(alias = "runOptimizer")]
    pub run_yul_optimiser: bool,
    pub optimize_stack_allocation: bool,
    pub yul_optimiser_steps: Vec<String>,
    /// Weighting hint for the gas meter; applies to deployed code only.
    pub expected_executions_per_deployment: usize,
}

impl Default for OptimiserSettings {
    fn default() -> Self {
        Self::minimal()
    }
}

impl OptimiserSettings {
    /// No optimisation at all.
    pub fn none() -> Self {
        Self {
            run_yul_optimiser: false,
            optimize_stack_allocation: false,
            yul_optimiser_steps: Vec::new(),
            expected_executions_per_deployment: 200,
        }
    }

    /// Stack allocation only; the Yul optimiser stays off.
    pub fn minimal() -> Self {
        Self {
            optimize_stack_allocation: true,
            ..Self::none()
        }
    }

    pub fn standard() -> Self {
        Self {
            run_yul_optimiser: true,
            optimize_stack_allocation: true,
            yul_optimiser_steps: vec![DEFAULT_OPTIMISER_STEPS.to_string()],
            expected_executions_per_deployment: 200,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| CoreError::InvalidSettings(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings = OptimiserSettings::from_json(r#"{"runYulOptimiser": true}"#).unwrap();
        assert!(settings.run_yul_optimiser);
        assert!(settings.optimize_stack_allocation);
        assert_eq!(settings.expected_executions_per_deployment, 200);
        assert!(settings.yul_optimiser_steps.is_empty());
    }

    #[test]
    fn test_accepts_run_optimizer_alias() {
        let settings = OptimiserSettings::from_json(
            r#"{"runOptimizer": true, "expectedExecutionsPerDeployment": 1000}"#,
        )
        .unwrap();
        assert!(settings.run_yul_optimiser);
        assert_eq!(settings.expected_executions_per_deployment, 1000);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = OptimiserSettings::from_json("{\"runYulOptimiser\": 3}");
        assert!(matches!(result, Err(CoreError::InvalidSettings(_))));
    }

    #[test]
    fn test_standard_runs_the_optimiser() {
        assert!(OptimiserSettings::standard().run_yul_optimiser);
        assert!(!OptimiserSettings::default().run_yul_optimiser);
    }
}
