//! Swap transaction pipeline
//!
//! The module is split into focused parts:
//! - **errors**: error taxonomy with categories for logs and metrics
//! - **instructions**: quote instruction to native instruction mapping
//! - **options**: policy record (simulation, confirmation level, retries)
//! - **rpc**: the cluster seam and its `RpcClient` implementation
//! - **simulate**: the fail-closed simulation gate
//! - **pipeline**: build, sign, simulate, submit, confirm
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use quote_swap::quote::{QuoteClient, SwapRequest};
//! use quote_swap::tx_builder::{PipelineOptions, SolanaRpc, SwapPipeline};
//! use quote_swap::wallet::KeypairConfig;
//!
//! # async fn example(quotes: QuoteClient, key: KeypairConfig, request: SwapRequest)
//! # -> Result<(), quote_swap::tx_builder::SwapError> {
//! let options = PipelineOptions::default();
//! let rpc = SolanaRpc::new("https://api.mainnet-beta.solana.com", options.confirmation_level);
//! let pipeline = SwapPipeline::new(&rpc, &quotes, options);
//! let outcome = pipeline.run(&key, &request).await?;
//! println!("{:?}", outcome.signature());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod instructions;
pub mod options;
pub mod pipeline;
pub mod rpc;
pub mod simulate;

pub use errors::SwapError;
pub use instructions::{build_instructions, signer_keys};
pub use options::{ConfirmationLevel, PipelineOptions};
pub use pipeline::{SwapOutcome, SwapPipeline, SwapStage};
pub use rpc::{SignatureState, SolanaRpc, SwapRpc};
pub use simulate::SimulationReport;
