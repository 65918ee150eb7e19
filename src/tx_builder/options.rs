//! Pipeline policy options
//!
//! One options record replaces the per-revision variants of the swap flow:
//! whether to simulate before sending, how deeply settled the transaction must
//! be before it counts as confirmed, and how many times the RPC node may
//! rebroadcast it.

use serde::Deserialize;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Target settlement level for a submitted transaction
///
/// Ordered from shallowest to deepest, so `reached >= target` is the
/// confirmation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn commitment(self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment_level(),
        }
    }

    pub fn commitment_level(self) -> CommitmentLevel {
        match self {
            Self::Processed => CommitmentLevel::Processed,
            Self::Confirmed => CommitmentLevel::Confirmed,
            Self::Finalized => CommitmentLevel::Finalized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl Default for ConfirmationLevel {
    fn default() -> Self {
        Self::Confirmed
    }
}

impl fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!(
                "unknown confirmation level '{}', expected processed, confirmed or finalized",
                other
            )),
        }
    }
}

/// Policy knobs for one swap run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Dry-run the signed transaction and abort on any reported error
    pub simulate_before_send: bool,

    /// Settlement level the run waits for
    pub confirmation_level: ConfirmationLevel,

    /// Rebroadcast budget handed to the RPC node (`None` = node default)
    pub max_submit_retries: Option<usize>,

    /// Delay between signature status polls
    pub poll_interval_ms: u64,

    /// Timeout for the quote HTTP request
    pub request_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 { 500 }
fn default_request_timeout_secs() -> u64 { 30 }

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            simulate_before_send: true,
            confirmation_level: ConfirmationLevel::default(),
            max_submit_retries: None,
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl PipelineOptions {
    pub fn with_simulation(mut self, simulate_before_send: bool) -> Self {
        self.simulate_before_send = simulate_before_send;
        self
    }

    pub fn with_confirmation_level(mut self, level: ConfirmationLevel) -> Self {
        self.confirmation_level = level;
        self
    }

    pub fn with_max_submit_retries(mut self, retries: Option<usize>) -> Self {
        self.max_submit_retries = retries;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject values that would make the run hang or spin
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms > 60_000 {
            return Err(format!(
                "poll_interval_ms must be at most 60000, got {}",
                self.poll_interval_ms
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}
