//! Caller-facing error categories shared across crates.

use thiserror::Error;

use crate::codec::CodecError;

/// Top-level push error type.
///
/// Every module error in the engine converts into one of these categories.
/// Callers branch on the variant; the string payloads are for humans.
/// - [`PushError::Validation`] is always raised before any crypto or network work.
/// - [`PushError::CryptoInvariant`] is a defect, never a recoverable condition.
#[derive(Debug, Error)]
pub enum PushError {
    /// Malformed subscription keys, bad endpoint, oversized key id.
    #[error("validation error: {0}")]
    Validation(String),

    /// The token algorithm code is not one of `{RS,PS,ES,HS}{256,384,512}`,
    /// or no key material backs the requested combination.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Wrong key role, missing usage, or key/algorithm family mismatch.
    #[error("key usage error: {0}")]
    KeyUsage(String),

    /// An internal encryption invariant was violated (tag length, record size).
    #[error("crypto invariant violated: {0}")]
    CryptoInvariant(String),

    /// Input text could not be decoded (hex, base64, JSON, UTF-8).
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Network failure (`status` is `None`) or a non-2xx push service response.
    #[error("transport error (status {status:?}): {body}")]
    Transport {
        /// HTTP status returned by the push service, if a response arrived.
        status: Option<u16>,
        /// Response body text, or the network error description.
        body: String,
    },
}

impl PushError {
    /// Short machine-readable code for this error category.
    pub fn code(&self) -> &'static str {
        match self {
            PushError::Validation(_) => "validation_error",
            PushError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            PushError::KeyUsage(_) => "key_usage_error",
            PushError::CryptoInvariant(_) => "crypto_invariant",
            PushError::Decoding(_) => "decoding_error",
            PushError::Transport { .. } => "transport_error",
        }
    }

    /// Returns `true` for errors raised before any network call was attempted.
    pub fn is_local(&self) -> bool {
        !matches!(self, PushError::Transport { .. })
    }
}

impl From<CodecError> for PushError {
    fn from(e: CodecError) -> Self {
        PushError::Decoding(e.to_string())
    }
}
