//! Configuration module for the swap client
//!
//! Secrets and endpoints come from the environment (optionally a `.env`
//! file). Pipeline policy and default swap parameters come from an optional
//! TOML file. Everything is resolved once into an immutable [`Config`].

use crate::quote::SwapRequest;
use crate::tx_builder::PipelineOptions;
use crate::wallet::{KeyError, KeypairConfig};
use reqwest::Url;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub const ENV_API_KEY: &str = "ZEROEX_API_KEY";
pub const ENV_PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const ENV_RPC_URL: &str = "RPC_URL";
pub const ENV_RPC_API_KEY: &str = "RPC_API_KEY";
pub const ENV_QUOTE_URL: &str = "ZEROEX_QUOTE_URL";

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_QUOTE_URL: &str = "https://staging.api.0x.org/solana/quote";
const HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com/";

/// Wrapped SOL mint
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid URL in {var}: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("invalid PRIVATE_KEY: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("failed to read config file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
pub struct Config {
    /// API key sent with every quote request
    pub zeroex_api_key: String,

    pub rpc_url: Url,

    pub quote_url: Url,

    pub keypair: KeypairConfig,

    pub pipeline: PipelineOptions,

    pub swap: SwapDefaults,
}

// API keys are redacted; the keypair prints only its pubkey
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // RPC_API_KEY travels in the query string
        let mut rpc_url = self.rpc_url.clone();
        rpc_url.set_query(None);

        f.debug_struct("Config")
            .field("zeroex_api_key", &"<redacted>")
            .field("rpc_url", &rpc_url.as_str())
            .field("quote_url", &self.quote_url.as_str())
            .field("keypair", &self.keypair)
            .field("pipeline", &self.pipeline)
            .field("swap", &self.swap)
            .finish()
    }
}

/// Swap parameters used when the command line does not override them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SwapDefaults {
    pub token_in: String,
    pub token_out: String,
    /// Input amount in base units
    pub amount_in: u64,
}

fn default_amount_in() -> u64 { 10_000_000 }

impl Default for SwapDefaults {
    fn default() -> Self {
        Self {
            token_in: WSOL_MINT.to_string(),
            token_out: USDC_MINT.to_string(),
            amount_in: default_amount_in(),
        }
    }
}

impl SwapDefaults {
    /// Resolve mint strings into a [`SwapRequest`]
    pub fn to_request(&self) -> Result<SwapRequest, ConfigError> {
        let token_in = parse_mint("token_in", &self.token_in)?;
        let token_out = parse_mint("token_out", &self.token_out)?;

        if token_in == token_out {
            return Err(ConfigError::Invalid(
                "token_in and token_out must differ".to_string(),
            ));
        }
        if self.amount_in == 0 {
            return Err(ConfigError::Invalid(
                "amount_in must be greater than zero".to_string(),
            ));
        }

        Ok(SwapRequest {
            token_in,
            token_out,
            amount_in: self.amount_in,
        })
    }
}

fn parse_mint(field: &str, value: &str) -> Result<Pubkey, ConfigError> {
    Pubkey::from_str(value.trim())
        .map_err(|e| ConfigError::Invalid(format!("{} '{}' is not a valid address: {}", field, value, e)))
}

/// Sections accepted in the TOML file
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub pipeline: PipelineOptions,
    pub swap: SwapDefaults,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(content)?;
        file.pipeline.validate().map_err(ConfigError::Invalid)?;
        Ok(file)
    }
}

impl Config {
    /// Load from the process environment (after `.env`) plus an optional TOML file
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_env()?;

        if path.exists() {
            Ok(config.with_file(FileConfig::from_file(path)?))
        } else {
            warn!("Config file '{}' not found, using defaults", path.display());
            Ok(config)
        }
    }

    /// Environment only: `.env` if present, then the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let zeroex_api_key = var(ENV_API_KEY).ok_or(ConfigError::MissingVar(ENV_API_KEY))?;

        let rpc_url = match (var(ENV_RPC_URL), var(ENV_RPC_API_KEY)) {
            (Some(url), _) => parse_url(ENV_RPC_URL, &url)?,
            (None, Some(api_key)) => helius_url(&api_key)?,
            (None, None) => parse_url(ENV_RPC_URL, DEFAULT_RPC_URL)?,
        };

        let quote_url = match var(ENV_QUOTE_URL) {
            Some(url) => parse_url(ENV_QUOTE_URL, &url)?,
            None => parse_url(ENV_QUOTE_URL, DEFAULT_QUOTE_URL)?,
        };

        let keypair = match var(ENV_PRIVATE_KEY) {
            Some(secret) => KeypairConfig::from_base58(&secret)?,
            None => KeypairConfig::generate(),
        };

        Ok(Self {
            zeroex_api_key,
            rpc_url,
            quote_url,
            keypair,
            pipeline: PipelineOptions::default(),
            swap: SwapDefaults::default(),
        })
    }

    pub fn with_file(mut self, file: FileConfig) -> Self {
        self.pipeline = file.pipeline;
        self.swap = file.swap;
        self
    }
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|e| ConfigError::InvalidUrl {
        var,
        reason: e.to_string(),
    })
}

fn helius_url(api_key: &str) -> Result<Url, ConfigError> {
    let mut url = parse_url(ENV_RPC_API_KEY, HELIUS_RPC_URL)?;
    url.query_pairs_mut().append_pair("api-key", api_key.trim());
    Ok(url)
}
