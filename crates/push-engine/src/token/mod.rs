//! Compact signed-claims tokens: `base64url(header).base64url(payload).base64url(signature)`.
//!
//! # Signing input
//!
//! The signed bytes are always the first two segments *exactly as they appear
//! in the token string*. Verification never re-serialises parsed JSON, so key
//! order or whitespace produced by another issuer cannot break a signature.

pub mod algorithm;
pub mod compact;
pub mod key;

pub use algorithm::{Algorithm, AlgorithmFamily, HashWidth};
pub use compact::{CompactToken, TokenHeader};
pub use key::{KeyRole, KeyUsage, TokenKey};

use common::{CodecError, PushError};
use thiserror::Error;

/// Errors produced by the token layer.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The algorithm code is unknown, or no key material backs the combination.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Wrong key role, missing usage, or algorithm family mismatch.
    #[error("{0}")]
    KeyUsage(&'static str),

    /// Key bytes could not be imported or exported.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The token string is not three dot-separated segments.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// A segment decoded but is not the expected JSON shape.
    #[error("token json: {0}")]
    Json(#[from] serde_json::Error),

    /// A segment is not valid base64url / UTF-8.
    #[error("token segment: {0}")]
    Codec(#[from] CodecError),
}

impl From<TokenError> for PushError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::UnsupportedAlgorithm(_) => PushError::UnsupportedAlgorithm(e.to_string()),
            TokenError::KeyUsage(_) => PushError::KeyUsage(e.to_string()),
            TokenError::InvalidKey(_) => PushError::Validation(e.to_string()),
            TokenError::Malformed(_) | TokenError::Json(_) | TokenError::Codec(_) => {
                PushError::Decoding(e.to_string())
            }
        }
    }
}
