//! quote-swap - fetch a 0x Solana swap quote and submit it on chain
//!
//! This library exposes the pipeline pieces for the binary and for tests.

pub mod config;
pub mod metrics;
pub mod observability;
pub mod quote;
pub mod structured_logging;
pub mod tx_builder;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
