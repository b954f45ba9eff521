//! `aes128gcm` message encryption for web push.
//!
//! # Body format
//!
//! ```text
//! salt (16) | rs (u32 BE) | idlen (1) | keyid (idlen) | record 0 | record 1 | ...
//! record = AES-128-GCM(pad_len (1) | zero pad | data) | tag (16)
//! ```
//!
//! Every record except the last is exactly `rs` bytes. This engine always
//! writes `pad_len = 0`; the decrypter accepts any zero padding.
//!
//! # Key schedule
//!
//! ```text
//! ikm   = HKDF(salt = auth_secret, ikm = ECDH(local, remote),
//!              info = "WebPush: info\0" | receiver_pub | sender_pub, L = 32)
//! prk   = HKDF-Extract(salt = header.salt, ikm)
//! key   = HKDF-Expand(prk, "Content-Encoding: aes128gcm\0", 16)
//! nonce = HKDF-Expand(prk, "Content-Encoding: nonce\0", 12) XOR seq (low 48 bits)
//! ```
//!
//! The receiver-then-sender ordering in the info string is fixed by the
//! decrypting browser and must not change.

pub mod derive;
pub mod ece;
pub mod header;

pub use ece::{decrypt, encrypt, generate_salt, DecryptParams, EncryptParams, KeyInput};
pub use header::EceHeader;

use common::{CodecError, PushError};
use thiserror::Error;

/// Default (and only emitted) record size in bytes.
pub const RECORD_SIZE: u32 = 4096;

/// Length of the pad-length prefix in each record.
pub const PAD_SIZE: usize = 1;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Per-record overhead: pad-length prefix plus tag.
pub const RECORD_OVERHEAD: usize = PAD_SIZE + TAG_LEN;

/// AES-128 content key length.
pub const KEY_LEN: usize = 16;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// Header salt length.
pub const SALT_LEN: usize = 16;

/// Errors produced by the content-encryption layer.
#[derive(Debug, Error)]
pub enum EceError {
    /// The sender key id does not fit in the one-byte length field.
    #[error("keyid is too large: {0} bytes (max 255)")]
    KeyIdTooLarge(usize),

    /// The salt is not exactly [`SALT_LEN`] bytes.
    #[error("salt must be {SALT_LEN} bytes, got {0}")]
    InvalidSalt(usize),

    /// A public key is not a valid P-256 point.
    #[error("invalid P-256 public key")]
    InvalidPublicKey,

    /// No authentication secret was supplied.
    #[error("no authentication secret for webpush")]
    MissingAuthSecret,

    /// A base64url key input did not decode.
    #[error("key input: {0}")]
    Codec(#[from] CodecError),

    /// The body ended before a complete header or record.
    #[error("truncated body: {0}")]
    Truncated(&'static str),

    /// The header declares a record size too small to hold any data.
    #[error("record size {0} is too small")]
    InvalidRecordSize(u32),

    /// A record failed authentication: wrong key, wrong secret, or tampering.
    #[error("record {0} failed authentication")]
    Authentication(u64),

    /// A decrypted record's padding is malformed.
    #[error("record {0} has invalid padding")]
    InvalidPadding(u64),

    /// An internal invariant broke; the output would be malformed.
    #[error("{0}")]
    Invariant(String),
}

impl From<EceError> for PushError {
    fn from(e: EceError) -> Self {
        match e {
            EceError::KeyIdTooLarge(_)
            | EceError::InvalidSalt(_)
            | EceError::InvalidPublicKey
            | EceError::MissingAuthSecret => PushError::Validation(e.to_string()),
            EceError::Codec(_)
            | EceError::Truncated(_)
            | EceError::InvalidRecordSize(_)
            | EceError::Authentication(_)
            | EceError::InvalidPadding(_) => PushError::Decoding(e.to_string()),
            EceError::Invariant(_) => PushError::CryptoInvariant(e.to_string()),
        }
    }
}
