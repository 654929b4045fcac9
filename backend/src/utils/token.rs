//! Session token generation.

use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

/// Number of random bytes in a session token.
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("randomness source unavailable: {0}")]
    RandomSource(String),
}

/// Source of fresh session tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> Result<String, TokenError>;
}

/// Generates hex-encoded tokens from the operating system's CSPRNG.
///
/// Each token is [`TOKEN_BYTES`] random bytes encoded as a
/// 64-character lowercase hexadecimal string.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngTokenGenerator;

impl TokenGenerator for OsRngTokenGenerator {
    fn generate(&self) -> Result<String, TokenError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::RandomSource(e.to_string()))?;
        Ok(hex::encode(bytes))
    }
}
