//! Quote response schema validation
//!
//! The quote API returns the instructions to execute as raw JSON. Nothing from
//! that body reaches the instruction builder unless it passes through
//! [`validate_quote`]: every address must be exactly 32 bytes, every byte must
//! fit in `u8`, every flag must be a boolean. Unknown fields are ignored.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Length of a Solana address in bytes
pub const ADDRESS_LEN: usize = 32;

/// A validated swap quote
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Output amount in the output token's base units, as the API reported it
    pub amount_out: Number,

    /// Instructions in execution order
    pub instructions: Vec<QuoteInstruction>,
}

impl Quote {
    /// Output amount as an integer, when the API sent one that fits
    pub fn amount_out_u64(&self) -> Option<u64> {
        self.amount_out.as_u64()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteInstruction {
    pub program_id: [u8; ADDRESS_LEN],
    pub accounts: Vec<QuoteAccount>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteAccount {
    pub pubkey: [u8; ADDRESS_LEN],
    pub is_signer: bool,
    pub is_writable: bool,
}

/// A quote response that does not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid quote response at `{path}`: {reason}")]
pub struct SchemaError {
    /// JSON path of the offending value, e.g. `instructions[1].accounts[0].pubkey`
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    fn mismatch(path: &str, expected: &str, found: &Value) -> Self {
        Self::new(path, format!("expected {}, got {}", expected, describe(found)))
    }
}

/// Validate a parsed quote response and convert it into a [`Quote`]
pub fn validate_quote(value: &Value) -> Result<Quote, SchemaError> {
    let root = as_object(value, "$")?;

    let amount_out = match required(root, "", "amountOut")? {
        Value::Number(n) => n.clone(),
        other => return Err(SchemaError::mismatch("amountOut", "a number", other)),
    };

    let instructions = as_array(required(root, "", "instructions")?, "instructions")?
        .iter()
        .enumerate()
        .map(|(i, ix)| validate_instruction(ix, &format!("instructions[{}]", i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Quote {
        amount_out,
        instructions,
    })
}

fn validate_instruction(value: &Value, path: &str) -> Result<QuoteInstruction, SchemaError> {
    let object = as_object(value, path)?;

    let program_id = address(
        required(object, path, "program_id")?,
        &join(path, "program_id"),
    )?;

    let accounts_path = join(path, "accounts");
    let accounts = as_array(required(object, path, "accounts")?, &accounts_path)?
        .iter()
        .enumerate()
        .map(|(i, account)| validate_account(account, &format!("{}[{}]", accounts_path, i)))
        .collect::<Result<Vec<_>, _>>()?;

    let data = byte_array(required(object, path, "data")?, &join(path, "data"))?;

    Ok(QuoteInstruction {
        program_id,
        accounts,
        data,
    })
}

fn validate_account(value: &Value, path: &str) -> Result<QuoteAccount, SchemaError> {
    let object = as_object(value, path)?;

    Ok(QuoteAccount {
        pubkey: address(required(object, path, "pubkey")?, &join(path, "pubkey"))?,
        is_signer: boolean(required(object, path, "is_signer")?, &join(path, "is_signer"))?,
        is_writable: boolean(
            required(object, path, "is_writable")?,
            &join(path, "is_writable"),
        )?,
    })
}

fn required<'a>(
    object: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Value, SchemaError> {
    object
        .get(key)
        .ok_or_else(|| SchemaError::new(join(path, key), "missing required field"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::mismatch(path, "an object", value))
}

fn as_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value
        .as_array()
        .ok_or_else(|| SchemaError::mismatch(path, "an array", value))
}

fn boolean(value: &Value, path: &str) -> Result<bool, SchemaError> {
    value
        .as_bool()
        .ok_or_else(|| SchemaError::mismatch(path, "a boolean", value))
}

fn byte_array(value: &Value, path: &str) -> Result<Vec<u8>, SchemaError> {
    as_array(value, path)?
        .iter()
        .enumerate()
        .map(|(i, element)| {
            element
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| {
                    SchemaError::mismatch(
                        &format!("{}[{}]", path, i),
                        "an integer in 0..=255",
                        element,
                    )
                })
        })
        .collect()
}

fn address(value: &Value, path: &str) -> Result<[u8; ADDRESS_LEN], SchemaError> {
    let bytes = byte_array(value, path)?;
    <[u8; ADDRESS_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        SchemaError::new(
            path,
            format!("expected {} bytes, got {}", ADDRESS_LEN, bytes.len()),
        )
    })
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(_) => "a string".to_string(),
        Value::Array(items) => format!("an array of length {}", items.len()),
        Value::Object(_) => "an object".to_string(),
    }
}
