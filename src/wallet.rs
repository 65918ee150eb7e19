//! Signing key resolution
//!
//! The swap taker is either a user-supplied keypair (base58 secret bytes from
//! the environment) or a freshly generated one. A generated key owns no funds,
//! so the pipeline only ever uses it to request a quote.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of an ed25519 secret key as Solana serializes it (secret || public)
pub const SECRET_KEY_LEN: usize = 64;

/// Where the signing key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProvenance {
    /// Generated at startup; owns nothing on chain
    Generated,
    /// Decoded from a secret supplied by the operator
    UserSupplied,
}

/// Errors raised while decoding a user-supplied secret key
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("secret key is not valid base58: {0}")]
    Encoding(String),

    #[error("invalid secret key length: expected 64 bytes, got {0}")]
    Length(usize),

    #[error("all-zero secret key rejected")]
    AllZero,

    #[error("invalid secret key bytes: {0}")]
    Invalid(String),
}

/// Signing key plus its provenance
pub struct KeypairConfig {
    keypair: Keypair,
    provenance: KeyProvenance,
}

impl KeypairConfig {
    /// Decode a base58 secret key (the format `solana-keygen` and most wallets export)
    pub fn from_base58(secret: &str) -> Result<Self, KeyError> {
        let bytes = Zeroizing::new(
            bs58::decode(secret.trim())
                .into_vec()
                .map_err(|e| KeyError::Encoding(e.to_string()))?,
        );

        if bytes.len() != SECRET_KEY_LEN {
            return Err(KeyError::Length(bytes.len()));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(KeyError::AllZero);
        }

        let keypair =
            Keypair::try_from(bytes.as_slice()).map_err(|e| KeyError::Invalid(e.to_string()))?;

        Ok(Self {
            keypair,
            provenance: KeyProvenance::UserSupplied,
        })
    }

    /// Generate a throwaway keypair
    pub fn generate() -> Self {
        Self {
            keypair: Keypair::new(),
            provenance: KeyProvenance::Generated,
        }
    }

    pub fn from_keypair(keypair: Keypair, provenance: KeyProvenance) -> Self {
        Self {
            keypair,
            provenance,
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn provenance(&self) -> KeyProvenance {
        self.provenance
    }

    /// Only user-supplied keys may sign and submit
    pub fn is_user_supplied(&self) -> bool {
        self.provenance == KeyProvenance::UserSupplied
    }
}

// Never print secret bytes
impl fmt::Debug for KeypairConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairConfig")
            .field("pubkey", &self.pubkey())
            .field("provenance", &self.provenance)
            .finish()
    }
}
