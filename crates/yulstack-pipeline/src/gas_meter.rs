use yulstack_core::analysis::literal_value;
use yulstack_core::ast::Literal;
use yulstack_core::{EvmDialect, EvmVersion};

const VERY_LOW_GAS: u64 = 3;
const TX_DATA_ZERO_GAS: u64 = 4;
const TX_DATA_NON_ZERO_GAS_EIP2028: u64 = 16;
const TX_DATA_NON_ZERO_GAS_FRONTIER: u64 = 68;
const CREATE_DATA_GAS: u64 = 200;

/// Weighs code size against execution cost for the optimiser.
///
/// Creation code runs once, so its cost is run gas plus the cost of shipping its bytes in the
/// deploy transaction. Deployed code runs `runs` times and its bytes are stored at deploy time.
#[derive(Debug, Clone, Copy)]
pub struct GasMeter {
    dialect: &'static EvmDialect,
    is_creation: bool,
    runs: usize,
}

impl GasMeter {
    pub fn new(dialect: &'static EvmDialect, is_creation: bool, runs: usize) -> Self {
        Self {
            dialect,
            is_creation,
            runs: if is_creation { 1 } else { runs },
        }
    }

    pub fn evm_version(&self) -> EvmVersion {
        self.dialect.version()
    }

    pub fn is_creation(&self) -> bool {
        self.is_creation
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn data_gas(&self, bytes: &[u8]) -> u64 {
        if !self.is_creation {
            return bytes.len() as u64 * CREATE_DATA_GAS;
        }
        let non_zero_gas = if self.evm_version() >= EvmVersion::Istanbul {
            TX_DATA_NON_ZERO_GAS_EIP2028
        } else {
            TX_DATA_NON_ZERO_GAS_FRONTIER
        };
        bytes
            .iter()
            .map(|byte| if *byte == 0 { TX_DATA_ZERO_GAS } else { non_zero_gas })
            .sum()
    }

    /// Run gas and data gas of pushing `literal`: the push opcode plus its immediate.
    pub fn literal_costs(&self, literal: &Literal) -> (u64, u64) {
        let mut immediate = literal_value(literal)
            .map(|value| value.to_bytes_be())
            .unwrap_or_default();
        immediate.insert(0, 0x60);
        (VERY_LOW_GAS, self.data_gas(&immediate))
    }

    pub fn combine_costs(&self, run_gas: u64, data_gas: u64) -> u64 {
        run_gas
            .saturating_mul(self.runs as u64)
            .saturating_add(data_gas)
    }
}
