//! RPC collaborator for the swap pipeline
//!
//! The pipeline needs five things from the cluster: a recent blockhash with
//! its validity window, the current block height, a dry run, submission, and
//! signature status. [`SwapRpc`] is that seam; [`SolanaRpc`] backs it with the
//! nonblocking `RpcClient`.

use crate::tx_builder::errors::SwapError;
use crate::tx_builder::options::ConfirmationLevel;
use crate::tx_builder::simulate::SimulationReport;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::TransactionStatus;
use tracing::debug;

/// Status of a submitted signature as seen by the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    pub slot: u64,
    /// Deepest settlement level the transaction has reached
    pub level: ConfirmationLevel,
    /// On-chain execution error, if the transaction failed
    pub err: Option<String>,
}

#[async_trait]
pub trait SwapRpc: Send + Sync {
    /// Recent blockhash and the last block height at which it is valid
    async fn latest_blockhash(&self) -> Result<(Hash, u64), SwapError>;

    async fn block_height(&self) -> Result<u64, SwapError>;

    /// Dry-run a signed transaction with signature verification enabled
    async fn simulate(&self, tx: &Transaction) -> Result<SimulationReport, SwapError>;

    /// Broadcast with preflight on; `max_retries` is the node's rebroadcast budget
    async fn send(&self, tx: &Transaction, max_retries: Option<usize>) -> Result<Signature, SwapError>;

    /// `None` while the cluster has not seen the signature
    async fn signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>, SwapError>;
}

/// [`SwapRpc`] over a Solana JSON-RPC endpoint
pub struct SolanaRpc {
    client: RpcClient,
    commitment: CommitmentConfig,
    /// Used for blockhash and block height; never shallower than confirmed
    chain_commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(url: impl ToString, level: ConfirmationLevel) -> Self {
        let commitment = level.commitment();
        Self {
            client: RpcClient::new_with_commitment(url.to_string(), commitment),
            commitment,
            chain_commitment: chain_level(level).commitment(),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

/// A processed blockhash may sit on a minority fork
fn chain_level(level: ConfirmationLevel) -> ConfirmationLevel {
    level.max(ConfirmationLevel::Confirmed)
}

fn reached_level(status: &TransactionStatus) -> ConfirmationLevel {
    [ConfirmationLevel::Finalized, ConfirmationLevel::Confirmed]
        .into_iter()
        .find(|level| status.satisfies_commitment(level.commitment()))
        .unwrap_or(ConfirmationLevel::Processed)
}

#[async_trait]
impl SwapRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), SwapError> {
        self.client
            .get_latest_blockhash_with_commitment(self.chain_commitment)
            .await
            .map_err(|e| SwapError::Blockhash(e.to_string()))
    }

    async fn block_height(&self) -> Result<u64, SwapError> {
        self.client
            .get_block_height_with_commitment(self.chain_commitment)
            .await
            .map_err(|e| SwapError::rpc("getBlockHeight", e))
    }

    async fn simulate(&self, tx: &Transaction) -> Result<SimulationReport, SwapError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: true,
            replace_recent_blockhash: false,
            commitment: Some(self.commitment),
            ..Default::default()
        };

        let result = self
            .client
            .simulate_transaction_with_config(tx, config)
            .await
            .map_err(|e| SwapError::rpc("simulateTransaction", e))?
            .value;

        debug!(
            err = ?result.err,
            units_consumed = ?result.units_consumed,
            "Simulation response"
        );

        Ok(SimulationReport {
            err: result.err.map(|e| format!("{:?}", e)),
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    async fn send(&self, tx: &Transaction, max_retries: Option<usize>) -> Result<Signature, SwapError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries,
            ..Default::default()
        };

        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(|e| SwapError::Submit(e.to_string()))
    }

    async fn signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>, SwapError> {
        let statuses = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(|e| SwapError::rpc("getSignatureStatuses", e))?;

        Ok(statuses.value.into_iter().next().flatten().map(|status| SignatureState {
            slot: status.slot,
            level: reached_level(&status),
            err: status.err.as_ref().map(|e| format!("{:?}", e)),
        }))
    }
}
