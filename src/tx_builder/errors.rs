//! Error types for the swap pipeline
//!
//! Every failure that ends a run before a terminal on-chain status is one of
//! these. A transaction that lands with an on-chain error is not an error
//! here: it is reported as [`SwapOutcome::Failed`](super::SwapOutcome::Failed).

use crate::quote::QuoteError;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwapError {
    /// Quote could not be fetched or failed validation
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// The quote contained nothing to execute
    #[error("quote contains no instructions")]
    EmptyQuote,

    /// An instruction expects a signature the taker cannot provide
    #[error("quote requires signer {0} which is not the taker")]
    UnexpectedSigner(Pubkey),

    /// Failed to fetch a recent blockhash
    #[error("blockhash error: {0}")]
    Blockhash(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// The dry run reported a chain-level failure; nothing was submitted
    #[error("simulation failed: {error}")]
    Simulation {
        error: String,
        /// Program log lines returned by the simulation
        logs: Vec<String>,
    },

    /// The node refused the transaction at submission
    #[error("submission failed: {0}")]
    Submit(String),

    /// Any other RPC failure
    #[error("RPC error during {operation}: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
    },

    /// The blockhash validity window closed before the target level was reached
    #[error("transaction {signature} expired: block height exceeded {last_valid_block_height}")]
    Expired {
        signature: Signature,
        last_valid_block_height: u64,
    },
}

impl SwapError {
    /// Error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Quote(inner) => inner.category(),
            Self::EmptyQuote | Self::UnexpectedSigner(_) => "validation",
            Self::Blockhash(_) => "blockhash",
            Self::Signing(_) => "signing",
            Self::Simulation { .. } => "simulation",
            Self::Submit(_) => "submit",
            Self::Rpc { .. } => "rpc",
            Self::Expired { .. } => "expired",
        }
    }

    /// True when the error was raised before any transaction was signed
    pub fn before_signing(&self) -> bool {
        matches!(
            self,
            Self::Quote(_) | Self::EmptyQuote | Self::UnexpectedSigner(_) | Self::Blockhash(_)
        )
    }

    pub fn rpc(operation: &'static str, err: impl ToString) -> Self {
        Self::Rpc {
            operation,
            message: err.to_string(),
        }
    }
}
