//! quote-swap - swap tokens on Solana through the 0x quote API
//!
//! Fetches a quote for the configured pair, turns its instructions into a
//! transaction signed by the operator's key, gates it behind a simulation,
//! submits it and waits for the configured confirmation level. Without a
//! `PRIVATE_KEY` the run stops after printing the quote.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use quote_swap::config::Config;
use quote_swap::metrics::metrics;
use quote_swap::quote::QuoteClient;
use quote_swap::tx_builder::{ConfirmationLevel, SolanaRpc, SwapOutcome, SwapPipeline};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "SWAP_CONFIG", default_value = "swap.toml")]
    config: PathBuf,

    /// Mint of the token to sell
    #[arg(long, env = "SWAP_TOKEN_IN")]
    token_in: Option<String>,

    /// Mint of the token to buy
    #[arg(long, env = "SWAP_TOKEN_OUT")]
    token_out: Option<String>,

    /// Amount to sell, in base units of the input token
    #[arg(long, env = "SWAP_AMOUNT")]
    amount: Option<u64>,

    /// Confirmation level to wait for (processed, confirmed, finalized)
    #[arg(long, env = "SWAP_CONFIRMATION")]
    confirmation: Option<ConfirmationLevel>,

    /// Submit without simulating first
    #[arg(long)]
    skip_simulation: bool,

    /// Resend attempts the RPC node may make for the submitted transaction
    #[arg(long, env = "SWAP_MAX_RETRIES")]
    max_retries: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command line flags win over the TOML file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(token_in) = &self.token_in {
            config.swap.token_in = token_in.clone();
        }
        if let Some(token_out) = &self.token_out {
            config.swap.token_out = token_out.clone();
        }
        if let Some(amount) = self.amount {
            config.swap.amount_in = amount;
        }
        if let Some(level) = self.confirmation {
            config.pipeline.confirmation_level = level;
        }
        if self.skip_simulation {
            config.pipeline.simulate_before_send = false;
        }
        if self.max_retries.is_some() {
            config.pipeline.max_submit_retries = self.max_retries;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env fallbacks
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("🚀 Starting quote-swap v{}", env!("CARGO_PKG_VERSION"));

    info!("📋 Loading configuration from: {}", args.config.display());
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    args.apply_overrides(&mut config);

    let request = config
        .swap
        .to_request()
        .context("Invalid swap parameters")?;

    if config.keypair.is_user_supplied() {
        info!("🔑 Signing as {}", config.keypair.pubkey());
    } else {
        warn!(
            "No PRIVATE_KEY set, generated {} for quoting only",
            config.keypair.pubkey()
        );
    }
    info!(
        token_in = %request.token_in,
        token_out = %request.token_out,
        amount_in = request.amount_in,
        confirmation = %config.pipeline.confirmation_level,
        simulate = config.pipeline.simulate_before_send,
        "Swap request"
    );

    let quotes = QuoteClient::new(
        config.quote_url.clone(),
        config.zeroex_api_key.clone(),
        config.pipeline.request_timeout(),
    )
    .context("Failed to build quote client")?;
    let rpc = SolanaRpc::new(&config.rpc_url, config.pipeline.confirmation_level);
    let pipeline = SwapPipeline::new(&rpc, &quotes, config.pipeline.clone());

    let outcome = pipeline
        .run(&config.keypair, &request)
        .await
        .context("Swap failed")?;

    match &outcome {
        SwapOutcome::QuoteOnly { quote } => {
            info!(
                amount_out = %quote.amount_out,
                instructions = quote.instructions.len(),
                "📈 Quote received; set PRIVATE_KEY to execute the swap"
            );
        }
        SwapOutcome::Confirmed {
            signature, level, ..
        } => {
            info!("✅ Swap complete ({}). https://solscan.io/tx/{}", level, signature);
        }
        SwapOutcome::Failed { signature, error } => {
            error!(
                "❌ Swap landed but failed on chain: {}. https://solscan.io/tx/{}",
                error, signature
            );
        }
    }

    match metrics().render() {
        Ok(snapshot) => debug!("Metrics snapshot:\n{}", snapshot),
        Err(e) => warn!("Failed to render metrics: {}", e),
    }

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "quote_swap=debug,info"
    } else {
        "quote_swap=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}
