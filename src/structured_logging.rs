//! Structured logging for swap runs

use crate::observability::{CorrelationId, TraceContext};
use crate::tx_builder::SwapStage;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Emits one structured event per pipeline step, tagged with the run's correlation id
#[derive(Debug, Clone)]
pub struct SwapLogger {
    correlation_id: CorrelationId,
}

impl SwapLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn run_started(&self, trace: &TraceContext) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            trace_id = %trace.trace_id,
            operation = %trace.operation,
            started_at = trace.timestamp,
            "Swap run started"
        );
    }

    pub fn stage(&self, stage: SwapStage) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            stage = stage.as_str(),
            "Swap stage reached"
        );
    }

    pub fn quote_received(&self, amount_out: &serde_json::Number, instruction_count: usize) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            amount_out = %amount_out,
            instruction_count,
            "Quote received"
        );
    }

    pub fn quote_only(&self, taker: &Pubkey) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            taker = %taker,
            "Signing key was generated and owns no funds; not signing or submitting"
        );
    }

    pub fn simulation_failed(&self, error: &str, logs: &[String]) {
        tracing::error!(
            correlation_id = %self.correlation_id,
            error = %error,
            log_lines = logs.len(),
            "Simulation failed; transaction not submitted"
        );
        for line in logs {
            tracing::error!(correlation_id = %self.correlation_id, "  {}", line);
        }
    }

    pub fn submitted(&self, signature: &Signature) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn confirmed(&self, signature: &Signature, slot: u64, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            slot,
            latency_ms,
            "Swap confirmed"
        );
    }

    pub fn failed(&self, signature: &Signature, error: &str, latency_ms: u64) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            error = %error,
            latency_ms,
            "Swap landed with an on-chain error"
        );
    }

    pub fn error(&self, category: &str, message: &str) {
        tracing::error!(
            correlation_id = %self.correlation_id,
            category = %category,
            message = %message,
            "Swap run aborted"
        );
    }
}
