//! Lossless conversions between raw bytes and hex, base64, base64url, and UTF-8 text.
//!
//! base64url output never carries `=` padding. base64url input is accepted
//! with or without padding, since browsers hand out subscription keys both ways.

use std::fmt;
use std::ops::Deref;

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use thiserror::Error;

/// URL-safe engine: encodes without padding, decodes padded or unpadded input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced when decoding text into bytes (or bytes into text).
#[derive(Debug, Error)]
pub enum CodecError {
    /// Odd-length input or a non-hex character.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// Malformed base64 / base64url: bad alphabet, bad length, bad padding.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The bytes are not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// An owned, immutable-by-convention byte sequence with text encodings.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteSequence(Vec<u8>);

impl ByteSequence {
    /// Decode exactly two hex characters per output byte.
    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        Ok(Self(hex::decode(hex)?))
    }

    /// Decode standard (`+/`, padded) base64.
    pub fn from_base64(b64: &str) -> Result<Self, CodecError> {
        Ok(Self(STANDARD.decode(b64)?))
    }

    /// Decode URL-safe (`-_`) base64, padding optional.
    pub fn from_base64url(b64url: &str) -> Result<Self, CodecError> {
        Ok(Self(URL_SAFE_LENIENT.decode(b64url)?))
    }

    /// UTF-8 bytes of `text`.
    pub fn from_text(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }

    /// Lowercase hex, two characters per byte.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Standard base64 with `=` padding.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// URL-safe base64 with trailing padding stripped.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_LENIENT.encode(&self.0)
    }

    /// Interpret the bytes as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Utf8`] if the bytes are not valid UTF-8.
    pub fn to_text(&self) -> Result<String, CodecError> {
        Ok(std::str::from_utf8(&self.0)?.to_owned())
    }

    /// Consume the sequence, returning the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for ByteSequence {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ByteSequence {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteSequence {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteSequence {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for ByteSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteSequence({})", self.to_hex())
    }
}
