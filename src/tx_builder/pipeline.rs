//! Quote-to-confirmed-transaction pipeline
//!
//! One run walks a single transaction through
//! `Quoted → Built → Signed → (Simulated) → Submitted → Confirmed | Failed`.
//! Every step is one awaited network call; nothing runs concurrently and
//! nothing is retried here. A generated signing key stops the run after the
//! quote, and a failed simulation stops it before submission.

use crate::metrics::metrics;
use crate::observability::TraceContext;
use crate::quote::{Quote, QuoteSource, SwapRequest};
use crate::structured_logging::SwapLogger;
use crate::tx_builder::errors::SwapError;
use crate::tx_builder::instructions::{build_instructions, signer_keys};
use crate::tx_builder::options::{ConfirmationLevel, PipelineOptions};
use crate::tx_builder::rpc::SwapRpc;
use crate::wallet::KeypairConfig;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::time::Instant;
use tracing::{debug, instrument};

/// Pipeline position of a swap run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapStage {
    Quoted,
    Built,
    Signed,
    Simulated,
    Submitted,
    Confirmed,
    Failed,
}

impl SwapStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quoted => "quoted",
            Self::Built => "built",
            Self::Signed => "signed",
            Self::Simulated => "simulated",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

/// How a run ended, short of an aborting error
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// The key was generated, so the quote was fetched for display only
    QuoteOnly { quote: Quote },

    /// The transaction reached the configured confirmation level
    Confirmed {
        signature: Signature,
        slot: u64,
        level: ConfirmationLevel,
    },

    /// The transaction landed but the chain reported an execution error
    Failed { signature: Signature, error: String },
}

impl SwapOutcome {
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::QuoteOnly { .. } => None,
            Self::Confirmed { signature, .. } | Self::Failed { signature, .. } => Some(signature),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::QuoteOnly { .. } => "quote_only",
            Self::Confirmed { .. } => "confirmed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// A built, signed transaction and the block height its blockhash expires at
struct SignedSwap {
    tx: Transaction,
    last_valid_block_height: u64,
}

pub struct SwapPipeline<'a> {
    rpc: &'a dyn SwapRpc,
    quotes: &'a dyn QuoteSource,
    options: PipelineOptions,
}

impl<'a> SwapPipeline<'a> {
    pub fn new(rpc: &'a dyn SwapRpc, quotes: &'a dyn QuoteSource, options: PipelineOptions) -> Self {
        Self {
            rpc,
            quotes,
            options,
        }
    }

    /// Run one swap attempt from quote to terminal state
    pub async fn run(
        &self,
        keypair: &KeypairConfig,
        request: &SwapRequest,
    ) -> Result<SwapOutcome, SwapError> {
        let trace = TraceContext::new("swap");
        let logger = SwapLogger::new(trace.correlation_id().clone());
        logger.run_started(&trace);
        let started = Instant::now();
        metrics().runs_total.inc();

        let result = self.execute(&logger, keypair, request, started).await;

        match &result {
            Ok(outcome) => metrics().record_outcome(outcome.label()),
            Err(err) => {
                if let SwapError::Simulation { error, logs } = err {
                    logger.simulation_failed(error, logs);
                }
                metrics().record_error(err.category());
                logger.error(err.category(), &err.to_string());
            }
        }
        metrics().run_latency.observe(started.elapsed().as_secs_f64());

        result
    }

    #[instrument(skip_all, fields(correlation_id = %logger.correlation_id(), taker = %keypair.pubkey()))]
    async fn execute(
        &self,
        logger: &SwapLogger,
        keypair: &KeypairConfig,
        request: &SwapRequest,
        started: Instant,
    ) -> Result<SwapOutcome, SwapError> {
        let taker = keypair.pubkey();
        let quote = self.quotes.fetch_quote(&request.for_taker(taker)).await?;
        self.advance(logger, SwapStage::Quoted);
        logger.quote_received(&quote.amount_out, quote.instructions.len());

        if !keypair.is_user_supplied() {
            logger.quote_only(&taker);
            return Ok(SwapOutcome::QuoteOnly { quote });
        }

        let signed = self.build_and_sign(logger, keypair, &quote).await?;

        if self.options.simulate_before_send {
            let report = self.rpc.simulate(&signed.tx).await?.into_result()?;
            debug!(units_consumed = ?report.units_consumed, "Simulation succeeded");
            self.advance(logger, SwapStage::Simulated);
        }

        let signature = self
            .rpc
            .send(&signed.tx, self.options.max_submit_retries)
            .await?;
        self.advance(logger, SwapStage::Submitted);
        logger.submitted(&signature);

        let outcome = self
            .await_confirmation(&signature, signed.last_valid_block_height)
            .await?;

        let latency_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            SwapOutcome::Confirmed { slot, .. } => {
                self.advance(logger, SwapStage::Confirmed);
                logger.confirmed(&signature, *slot, latency_ms);
            }
            SwapOutcome::Failed { error, .. } => {
                self.advance(logger, SwapStage::Failed);
                logger.failed(&signature, error, latency_ms);
            }
            SwapOutcome::QuoteOnly { .. } => {}
        }

        Ok(outcome)
    }

    async fn build_and_sign(
        &self,
        logger: &SwapLogger,
        keypair: &KeypairConfig,
        quote: &Quote,
    ) -> Result<SignedSwap, SwapError> {
        let payer = keypair.pubkey();
        let instructions = build_instructions(&quote.instructions);
        if instructions.is_empty() {
            return Err(SwapError::EmptyQuote);
        }
        if let Some(foreign) = first_foreign_signer(&instructions, &payer) {
            return Err(SwapError::UnexpectedSigner(foreign));
        }

        // Fetched as late as possible: a stale blockhash fails at submission
        let (blockhash, last_valid_block_height) = self.rpc.latest_blockhash().await?;
        let mut tx = Transaction::new_with_payer(&instructions, Some(&payer));
        self.advance(logger, SwapStage::Built);
        debug!(%blockhash, last_valid_block_height, "Transaction built");

        tx.try_sign(&[keypair.keypair()], blockhash)
            .map_err(|e| SwapError::Signing(e.to_string()))?;
        self.advance(logger, SwapStage::Signed);

        Ok(SignedSwap {
            tx,
            last_valid_block_height,
        })
    }

    /// Poll until the target level, an on-chain error, or blockhash expiry
    ///
    /// Expiry only applies while the cluster has not seen the signature. A
    /// landed transaction keeps being polled until it reaches the target level.
    async fn await_confirmation(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<SwapOutcome, SwapError> {
        let target = self.options.confirmation_level;
        let mut polls: u64 = 0;
        let mut landed = false;

        loop {
            polls += 1;
            if let Some(state) = self.rpc.signature_state(signature).await? {
                landed = true;
                if let Some(error) = state.err {
                    return Ok(SwapOutcome::Failed {
                        signature: *signature,
                        error,
                    });
                }
                if state.level >= target {
                    debug!(polls, level = %state.level, "Target confirmation level reached");
                    return Ok(SwapOutcome::Confirmed {
                        signature: *signature,
                        slot: state.slot,
                        level: state.level,
                    });
                }
            }

            if !landed {
                let block_height = self.rpc.block_height().await?;
                if block_height > last_valid_block_height {
                    return Err(SwapError::Expired {
                        signature: *signature,
                        last_valid_block_height,
                    });
                }
            }

            tokio::time::sleep(self.options.poll_interval()).await;
        }
    }

    fn advance(&self, logger: &SwapLogger, stage: SwapStage) {
        metrics().record_stage(stage.as_str());
        logger.stage(stage);
    }
}

fn first_foreign_signer(instructions: &[solana_sdk::instruction::Instruction], payer: &Pubkey) -> Option<Pubkey> {
    signer_keys(instructions).into_iter().find(|key| key != payer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{QuoteAccount, QuoteError, QuoteInstruction, SwapParams};
    use crate::tx_builder::rpc::SignatureState;
    use crate::tx_builder::simulate::SimulationReport;
    use crate::wallet::KeyProvenance;
    use async_trait::async_trait;
    use solana_sdk::{hash::Hash, signature::Keypair};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    enum FakeQuotes {
        /// One swap instruction signed by the taker
        Swap,
        /// A swap instruction that also wants a signature from someone else
        ForeignSigner(Pubkey),
        Empty,
        Status(u16, &'static str),
    }

    #[async_trait]
    impl QuoteSource for FakeQuotes {
        async fn fetch_quote(&self, params: &SwapParams) -> Result<Quote, QuoteError> {
            let taker = QuoteAccount {
                pubkey: params.taker.to_bytes(),
                is_signer: true,
                is_writable: true,
            };
            let instructions = match self {
                Self::Swap => vec![QuoteInstruction {
                    program_id: [6; 32],
                    accounts: vec![taker],
                    data: vec![1, 2, 3],
                }],
                Self::ForeignSigner(other) => vec![QuoteInstruction {
                    program_id: [6; 32],
                    accounts: vec![
                        taker,
                        QuoteAccount {
                            pubkey: other.to_bytes(),
                            is_signer: true,
                            is_writable: false,
                        },
                    ],
                    data: vec![],
                }],
                Self::Empty => vec![],
                Self::Status(status, text) => {
                    return Err(QuoteError::Status {
                        status: *status,
                        status_text: text.to_string(),
                    })
                }
            };
            Ok(Quote {
                amount_out: 1_523_004u64.into(),
                instructions,
            })
        }
    }

    struct FakeRpc {
        calls: Mutex<Vec<&'static str>>,
        simulation: SimulationReport,
        statuses: Mutex<VecDeque<Option<SignatureState>>>,
        block_height: u64,
        last_valid_block_height: u64,
        submitted: Mutex<Option<Transaction>>,
        max_retries_seen: Mutex<Option<Option<usize>>>,
    }

    impl FakeRpc {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                simulation: SimulationReport::default(),
                statuses: Mutex::new(VecDeque::new()),
                block_height: 100,
                last_valid_block_height: 250,
                submitted: Mutex::new(None),
                max_retries_seen: Mutex::new(None),
            }
        }

        fn with_statuses(self, statuses: Vec<Option<SignatureState>>) -> Self {
            *self.statuses.lock().unwrap() = statuses.into();
            self
        }

        fn with_simulation_error(mut self, error: &str) -> Self {
            self.simulation = SimulationReport {
                err: Some(error.to_string()),
                logs: vec!["Program log: Error: slippage tolerance exceeded".to_string()],
                units_consumed: Some(31_000),
            };
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl SwapRpc for FakeRpc {
        async fn latest_blockhash(&self) -> Result<(Hash, u64), SwapError> {
            self.record("latest_blockhash");
            Ok((Hash::new_unique(), self.last_valid_block_height))
        }

        async fn block_height(&self) -> Result<u64, SwapError> {
            self.record("block_height");
            Ok(self.block_height)
        }

        async fn simulate(&self, tx: &Transaction) -> Result<SimulationReport, SwapError> {
            self.record("simulate");
            assert!(tx.is_signed());
            Ok(self.simulation.clone())
        }

        async fn send(&self, tx: &Transaction, max_retries: Option<usize>) -> Result<Signature, SwapError> {
            self.record("send");
            *self.submitted.lock().unwrap() = Some(tx.clone());
            *self.max_retries_seen.lock().unwrap() = Some(max_retries);
            Ok(tx.signatures[0])
        }

        async fn signature_state(&self, _signature: &Signature) -> Result<Option<SignatureState>, SwapError> {
            self.record("signature_state");
            Ok(self.statuses.lock().unwrap().pop_front().flatten())
        }
    }

    fn landed(level: ConfirmationLevel) -> Option<SignatureState> {
        Some(SignatureState {
            slot: 321,
            level,
            err: None,
        })
    }

    fn user_key() -> KeypairConfig {
        KeypairConfig::from_keypair(Keypair::new(), KeyProvenance::UserSupplied)
    }

    fn request() -> SwapRequest {
        SwapRequest {
            token_in: Pubkey::new_unique(),
            token_out: Pubkey::new_unique(),
            amount_in: 10_000_000,
        }
    }

    fn fast_options() -> PipelineOptions {
        PipelineOptions::default().with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_happy_path_reaches_confirmed() {
        let rpc = FakeRpc::new().with_statuses(vec![landed(ConfirmationLevel::Confirmed)]);
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options().with_max_submit_retries(Some(2)));

        let outcome = pipeline.run(&key, &request()).await.unwrap();

        assert_eq!(
            rpc.calls(),
            vec!["latest_blockhash", "simulate", "send", "signature_state"]
        );
        match outcome {
            SwapOutcome::Confirmed { slot, level, signature } => {
                assert_eq!(slot, 321);
                assert_eq!(level, ConfirmationLevel::Confirmed);
                assert_ne!(signature, Signature::default());
            }
            other => panic!("expected confirmed outcome, got {other:?}"),
        }

        let submitted = rpc.submitted.lock().unwrap().clone().unwrap();
        assert_eq!(submitted.message.account_keys[0], key.pubkey());
        assert_eq!(submitted.message.instructions.len(), 1);
        assert_eq!(*rpc.max_retries_seen.lock().unwrap(), Some(Some(2)));
    }

    #[tokio::test]
    async fn test_generated_key_only_fetches_quote() {
        let rpc = FakeRpc::new();
        let quotes = FakeQuotes::Swap;
        let key = KeypairConfig::generate();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let outcome = pipeline.run(&key, &request()).await.unwrap();

        match outcome {
            SwapOutcome::QuoteOnly { quote } => assert_eq!(quote.instructions.len(), 1),
            other => panic!("expected quote-only outcome, got {other:?}"),
        }
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_simulation_error_blocks_submission() {
        let rpc = FakeRpc::new().with_simulation_error("InstructionError(0, Custom(6001))");
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let err = pipeline.run(&key, &request()).await.unwrap_err();

        match err {
            SwapError::Simulation { error, logs } => {
                assert_eq!(error, "InstructionError(0, Custom(6001))");
                assert_eq!(logs.len(), 1);
            }
            other => panic!("expected simulation error, got {other:?}"),
        }
        assert_eq!(rpc.calls(), vec!["latest_blockhash", "simulate"]);
        assert!(rpc.submitted.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_skipping_simulation_goes_straight_to_send() {
        let rpc = FakeRpc::new()
            .with_simulation_error("never consulted")
            .with_statuses(vec![landed(ConfirmationLevel::Finalized)]);
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options().with_simulation(false));

        let outcome = pipeline.run(&key, &request()).await.unwrap();

        assert!(matches!(outcome, SwapOutcome::Confirmed { .. }));
        assert_eq!(rpc.calls(), vec!["latest_blockhash", "send", "signature_state"]);
    }

    #[tokio::test]
    async fn test_on_chain_error_is_failed_outcome() {
        let rpc = FakeRpc::new().with_statuses(vec![Some(SignatureState {
            slot: 400,
            level: ConfirmationLevel::Confirmed,
            err: Some("InstructionError(1, Custom(1))".to_string()),
        })]);
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let outcome = pipeline.run(&key, &request()).await.unwrap();

        match outcome {
            SwapOutcome::Failed { error, .. } => {
                assert_eq!(error, "InstructionError(1, Custom(1))")
            }
            other => panic!("expected failed outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_polls_until_target_level() {
        let rpc = FakeRpc::new().with_statuses(vec![
            None,
            landed(ConfirmationLevel::Processed),
            landed(ConfirmationLevel::Confirmed),
            landed(ConfirmationLevel::Finalized),
        ]);
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let options = fast_options().with_confirmation_level(ConfirmationLevel::Finalized);
        let pipeline = SwapPipeline::new(&rpc, &quotes, options);

        let outcome = pipeline.run(&key, &request()).await.unwrap();

        assert!(matches!(
            outcome,
            SwapOutcome::Confirmed {
                level: ConfirmationLevel::Finalized,
                ..
            }
        ));
        let polls = rpc.calls().iter().filter(|c| **c == "signature_state").count();
        assert_eq!(polls, 4);
    }

    #[tokio::test]
    async fn test_processed_target_accepts_first_sighting() {
        let rpc = FakeRpc::new().with_statuses(vec![landed(ConfirmationLevel::Processed)]);
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let options = fast_options().with_confirmation_level(ConfirmationLevel::Processed);
        let pipeline = SwapPipeline::new(&rpc, &quotes, options);

        let outcome = pipeline.run(&key, &request()).await.unwrap();
        assert!(matches!(outcome, SwapOutcome::Confirmed { .. }));
    }

    #[tokio::test]
    async fn test_expired_blockhash_ends_polling() {
        let mut rpc = FakeRpc::new().with_statuses(vec![None]);
        rpc.block_height = 251;
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let err = pipeline.run(&key, &request()).await.unwrap_err();

        match err {
            SwapError::Expired {
                last_valid_block_height,
                ..
            } => assert_eq!(last_valid_block_height, 250),
            other => panic!("expected expiry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_landed_transaction_outlives_blockhash_window() {
        let mut rpc = FakeRpc::new().with_statuses(vec![
            landed(ConfirmationLevel::Processed),
            landed(ConfirmationLevel::Confirmed),
            landed(ConfirmationLevel::Finalized),
        ]);
        rpc.block_height = 251;
        let quotes = FakeQuotes::Swap;
        let key = user_key();
        let options = fast_options().with_confirmation_level(ConfirmationLevel::Finalized);
        let pipeline = SwapPipeline::new(&rpc, &quotes, options);

        let outcome = pipeline.run(&key, &request()).await.unwrap();

        match outcome {
            SwapOutcome::Confirmed { level, .. } => assert_eq!(level, ConfirmationLevel::Finalized),
            other => panic!("expected finalized outcome, got {other:?}"),
        }
        let calls = rpc.calls();
        assert_eq!(calls.iter().filter(|c| **c == "signature_state").count(), 3);
        assert!(!calls.contains(&"block_height"));
    }

    #[tokio::test]
    async fn test_quote_error_stops_before_any_rpc_call() {
        let rpc = FakeRpc::new();
        let quotes = FakeQuotes::Status(500, "Internal Server Error");
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let err = pipeline.run(&key, &request()).await.unwrap_err();

        assert!(matches!(err, SwapError::Quote(QuoteError::Status { status: 500, .. })));
        assert!(err.before_signing());
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_signer_is_rejected_before_blockhash() {
        let other = Pubkey::new_unique();
        let rpc = FakeRpc::new();
        let quotes = FakeQuotes::ForeignSigner(other);
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let err = pipeline.run(&key, &request()).await.unwrap_err();

        assert!(matches!(err, SwapError::UnexpectedSigner(key) if key == other));
        assert!(rpc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_quote_is_rejected() {
        let rpc = FakeRpc::new();
        let quotes = FakeQuotes::Empty;
        let key = user_key();
        let pipeline = SwapPipeline::new(&rpc, &quotes, fast_options());

        let err = pipeline.run(&key, &request()).await.unwrap_err();
        assert!(matches!(err, SwapError::EmptyQuote));
        assert!(rpc.calls().is_empty());
    }

    #[test]
    fn test_outcome_signature_and_label() {
        let signature = Signature::new_unique();
        let failed = SwapOutcome::Failed {
            signature,
            error: "x".to_string(),
        };
        assert_eq!(failed.signature(), Some(&signature));
        assert_eq!(failed.label(), "failed");

        let quote_only = SwapOutcome::QuoteOnly {
            quote: Quote {
                amount_out: 1u64.into(),
                instructions: vec![],
            },
        };
        assert_eq!(quote_only.signature(), None);
        assert_eq!(quote_only.label(), "quote_only");
    }
}
