//! Pre-submission simulation gate
//!
//! A signed transaction is dry-run with signature verification on. Any error
//! in the report aborts the run before submission; the gate never fails open.

use crate::tx_builder::errors::SwapError;

/// Result of a dry run, reduced to what the pipeline acts on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    /// Chain-level error, if the transaction would fail
    pub err: Option<String>,
    /// Program log lines
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

impl SimulationReport {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }

    /// Turn an error report into [`SwapError::Simulation`], keeping the logs
    pub fn into_result(self) -> Result<Self, SwapError> {
        match self.err {
            Some(error) => Err(SwapError::Simulation {
                error,
                logs: self.logs,
            }),
            None => Ok(self),
        }
    }
}
