//! Swap quote fetcher
//!
//! One POST per swap attempt. The caller never retries: a non-success status,
//! an undecodable body, or a body that fails schema validation all end the run.

use crate::quote::schema::{validate_quote, Quote, SchemaError};
use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Header carrying the quote provider's API key
pub const API_KEY_HEADER: &str = "0x-api-key";

/// What to swap, independent of who is swapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Pubkey,
    pub token_out: Pubkey,
    /// Input amount in the input token's base units
    pub amount_in: u64,
}

impl SwapRequest {
    pub fn for_taker(&self, taker: Pubkey) -> SwapParams {
        SwapParams {
            token_in: self.token_in,
            token_out: self.token_out,
            amount_in: self.amount_in,
            taker,
        }
    }
}

/// Full parameter set sent to the quote endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapParams {
    pub token_in: Pubkey,
    pub token_out: Pubkey,
    pub amount_in: u64,
    /// Address that will sign and pay for the swap
    pub taker: Pubkey,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequestBody {
    token_in: String,
    token_out: String,
    amount_in: u64,
    taker: String,
}

impl From<&SwapParams> for QuoteRequestBody {
    fn from(params: &SwapParams) -> Self {
        Self {
            token_in: params.token_in.to_string(),
            token_out: params.token_out.to_string(),
            amount_in: params.amount_in,
            taker: params.taker.to_string(),
        }
    }
}

/// Errors from fetching a quote
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Connection, TLS or timeout failure
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("failed to fetch quote: {status} {status_text}")]
    Status { status: u16, status_text: String },

    #[error("quote response is not valid JSON: {0}")]
    Decode(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl QuoteError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::Status { .. } => "transport",
            Self::Decode(_) | Self::Schema(_) => "validation",
        }
    }
}

/// Anything that can price a swap
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, params: &SwapParams) -> Result<Quote, QuoteError>;
}

/// HTTP client for the 0x Solana quote endpoint
#[derive(Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl QuoteClient {
    pub fn new(endpoint: Url, api_key: impl Into<String>, timeout: Duration) -> Result<Self, QuoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

// API key stays out of logs
impl std::fmt::Debug for QuoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[async_trait]
impl QuoteSource for QuoteClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_quote(&self, params: &SwapParams) -> Result<Quote, QuoteError> {
        let body = QuoteRequestBody::from(params);
        debug!(
            token_in = %body.token_in,
            token_out = %body.token_out,
            amount_in = body.amount_in,
            taker = %body.taker,
            "Requesting swap quote"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown Status").to_string();
            warn!(status = status.as_u16(), %status_text, "Quote endpoint rejected request");
            return Err(QuoteError::Status {
                status: status.as_u16(),
                status_text,
            });
        }

        let bytes = response.bytes().await?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| QuoteError::Decode(e.to_string()))?;

        Ok(validate_quote(&value)?)
    }
}
