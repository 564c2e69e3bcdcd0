use std::collections::HashMap;

use super::commission::CommissionModel;
use super::slippage::SlippageModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityType {
    Stock,
    Future,
    Option,
}

/// Per-instrument trading parameters: contract multiplier, tick size and the
/// commission/slippage models applied to its fills.
pub struct ContractSpec {
    pub multiplier: f64,
    pub tick_size: f64,
    pub security_type: SecurityType,
    pub commission_model: Box<dyn CommissionModel>,
    pub slippage_model: Box<dyn SlippageModel>,
}

impl ContractSpec {
    pub fn new(
        multiplier: f64,
        tick_size: f64,
        security_type: SecurityType,
        commission_model: impl CommissionModel + 'static,
        slippage_model: impl SlippageModel + 'static,
    ) -> Self {
        Self {
            multiplier,
            tick_size,
            security_type,
            commission_model: Box::new(commission_model),
            slippage_model: Box::new(slippage_model),
        }
    }
}

/// Maps instrument identifiers to their [`ContractSpec`], loaded once before
/// the engine starts running.
#[derive(Default)]
pub struct ContractRegistry {
    contracts: HashMap<String, ContractSpec>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, instrument: impl Into<String>, spec: ContractSpec) {
        self.contracts.insert(instrument.into(), spec);
    }

    pub fn get(&self, instrument: &str) -> Option<&ContractSpec> {
        self.contracts.get(instrument)
    }
}
