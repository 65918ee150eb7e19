//! Swap quotes: fetching and validating what the aggregator returns

pub mod client;
pub mod schema;

pub use client::{QuoteClient, QuoteError, QuoteSource, SwapParams, SwapRequest, API_KEY_HEADER};
pub use schema::{validate_quote, Quote, QuoteAccount, QuoteInstruction, SchemaError, ADDRESS_LEN};
