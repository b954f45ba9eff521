//! [`CompactToken`]: a raw token string with a parse-once cache.

use std::fmt;
use std::sync::OnceLock;

use common::ByteSequence;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::algorithm::Algorithm;
use super::key::TokenKey;
use super::TokenError;

/// Token header: `{"typ":"JWT","alg":"ES256"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Token type, `JWT` for every token this crate issues.
    pub typ: String,
    /// Signature algorithm code as written; parsed on sign and verify.
    pub alg: String,
}

impl TokenHeader {
    /// A `JWT` header for `alg`.
    pub fn jwt(alg: Algorithm) -> Self {
        Self {
            typ: "JWT".into(),
            alg: alg.to_string(),
        }
    }

    /// Parsed `alg` code.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnsupportedAlgorithm`] for an unknown code.
    pub fn algorithm(&self) -> Result<Algorithm, TokenError> {
        Algorithm::parse(&self.alg)
    }
}

#[derive(Debug)]
struct Parsed<P> {
    header: TokenHeader,
    payload: P,
    signature: ByteSequence,
}

/// A three-segment signed token over a payload of type `P`.
///
/// Holds the raw string; header, payload and signature are decoded on first
/// access and cached. Concurrent first access may decode twice; the decode is
/// pure, so whichever result lands first is kept.
pub struct CompactToken<P> {
    raw: String,
    parsed: OnceLock<Parsed<P>>,
}

impl<P> CompactToken<P> {
    /// Wrap a token string. Nothing is decoded until a field is read.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            parsed: OnceLock::new(),
        }
    }

    /// The token string exactly as constructed or signed.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// JSON-then-base64url, used identically for header and payload segments.
    pub fn encode_object<T: Serialize + ?Sized>(obj: &T) -> Result<String, TokenError> {
        let json = serde_json::to_vec(obj)?;
        Ok(ByteSequence::from(json).to_base64url())
    }

    /// First two segments, joined by the dot: the exact signed bytes.
    fn signing_input(&self) -> Result<&str, TokenError> {
        self.raw
            .rsplit_once('.')
            .map(|(input, _)| input)
            .ok_or_else(|| TokenError::Malformed("missing signature segment".into()))
    }
}

impl<P: DeserializeOwned> CompactToken<P> {
    fn parsed(&self) -> Result<&Parsed<P>, TokenError> {
        if let Some(parsed) = self.parsed.get() {
            return Ok(parsed);
        }
        let parsed = parse_segments(&self.raw)?;
        Ok(self.parsed.get_or_init(|| parsed))
    }

    /// Decoded header.
    pub fn header(&self) -> Result<&TokenHeader, TokenError> {
        Ok(&self.parsed()?.header)
    }

    /// Decoded payload.
    pub fn payload(&self) -> Result<&P, TokenError> {
        Ok(&self.parsed()?.payload)
    }

    /// Decoded signature bytes.
    pub fn signature(&self) -> Result<&ByteSequence, TokenError> {
        Ok(&self.parsed()?.signature)
    }

    /// Check the signature with `key`.
    ///
    /// Returns `Ok(false)` for a signature that does not match; errors are
    /// reserved for misuse (wrong role, missing usage, algorithm mismatch) and
    /// undecodable tokens.
    pub fn verify(&self, key: &TokenKey) -> Result<bool, TokenError> {
        let parsed = self.parsed()?;
        let alg = parsed.header.algorithm()?;
        key.check_verify(&alg)?;
        key.verify_bytes(&alg, self.signing_input()?.as_bytes(), &parsed.signature)
    }
}

impl<P: Serialize> CompactToken<P> {
    /// Encode `header` and `payload`, sign the joined segments with `key`, and
    /// append the signature segment.
    ///
    /// # Errors
    ///
    /// [`TokenError::UnsupportedAlgorithm`] for an unknown `alg` code;
    /// [`TokenError::KeyUsage`] if `key` is not a private/secret key with
    /// `sign` usage of the header's algorithm family;
    /// [`TokenError::UnsupportedAlgorithm`] if the key cannot produce that width.
    pub fn sign(header: &TokenHeader, payload: &P, key: &TokenKey) -> Result<Self, TokenError> {
        let alg = header.algorithm()?;
        key.check_sign(&alg)?;
        let input = format!(
            "{}.{}",
            Self::encode_object(header)?,
            Self::encode_object(payload)?
        );
        let signature = key.sign_bytes(&alg, input.as_bytes())?;
        let raw = format!("{input}.{}", ByteSequence::from(signature).to_base64url());
        Ok(Self::new(raw))
    }
}

fn parse_segments<P: DeserializeOwned>(raw: &str) -> Result<Parsed<P>, TokenError> {
    let mut parts = raw.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed("expected three dot-separated segments".into()));
    };
    Ok(Parsed {
        header: serde_json::from_slice(&ByteSequence::from_base64url(header)?)?,
        payload: serde_json::from_slice(&ByteSequence::from_base64url(payload)?)?,
        signature: ByteSequence::from_base64url(signature)?,
    })
}

impl<P> Clone for CompactToken<P> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<P> PartialEq for CompactToken<P> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<P> Eq for CompactToken<P> {}

impl<P> fmt::Display for CompactToken<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<P> fmt::Debug for CompactToken<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompactToken").field(&self.raw).finish()
    }
}
