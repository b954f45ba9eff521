//! VAPID application-server identification (RFC 8292).
//!
//! The `Authorization` header is `vapid t=<token>, k=<public key>` where the
//! token is an ES256 compact token over `{aud, exp, sub}` and the public key is
//! the raw uncompressed P-256 point in base64url.

use chrono::Utc;
use common::protocol::VapidKeyPair;
use common::{ByteSequence, CodecError, PushError};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::token::{Algorithm, CompactToken, KeyUsage, TokenError, TokenHeader, TokenKey};

/// Seconds from issuance until a VAPID token expires (12 hours).
pub const TOKEN_LIFETIME_SECS: i64 = 43_200;

/// Claims carried by a VAPID token. Field order is the serialised order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapidClaims {
    /// Origin of the push service endpoint.
    pub aud: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Contact URI of the application server operator.
    pub sub: String,
}

/// Errors produced while issuing or checking VAPID credentials.
#[derive(Debug, Error)]
pub enum VapidError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("vapid key: {0}")]
    Codec(#[from] CodecError),

    /// The `Authorization` header is not `vapid t=..., k=...`.
    #[error("malformed vapid authorization: {0}")]
    Malformed(&'static str),
}

impl From<VapidError> for PushError {
    fn from(e: VapidError) -> Self {
        match e {
            VapidError::Token(t) => t.into(),
            VapidError::Codec(_) | VapidError::Malformed(_) => PushError::Decoding(e.to_string()),
        }
    }
}

/// Generate a fresh P-256 key pair for VAPID signing.
///
/// # Errors
///
/// Returns [`VapidError::Token`] if PKCS#8 encoding fails.
pub fn generate_key_pair() -> Result<VapidKeyPair, VapidError> {
    let key = TokenKey::ecdsa_private(
        SigningKey::random(&mut OsRng),
        &[KeyUsage::Sign, KeyUsage::Verify],
    );
    let public = key
        .public_key_bytes()
        .ok_or(TokenError::InvalidKey("generated key has no public half".into()))?;
    let private = key.to_pkcs8_der()?;
    Ok(VapidKeyPair {
        public_key: ByteSequence::from(public).to_base64url(),
        private_key: ByteSequence::from(private).to_base64(),
    })
}

/// A VAPID key pair with the private half already imported for signing.
#[derive(Debug, Clone)]
pub struct VapidSigner {
    key: TokenKey,
    public_key: String,
}

impl VapidSigner {
    /// Import `private_key` (standard-base64 PKCS#8 DER). `public_key` is
    /// echoed verbatim in the `k=` parameter.
    ///
    /// # Errors
    ///
    /// [`VapidError::Codec`] if `private_key` is not base64;
    /// [`VapidError::Token`] if it is not a P-256 PKCS#8 key.
    pub fn new(public_key: &str, private_key: &str) -> Result<Self, VapidError> {
        let der = ByteSequence::from_base64(private_key)?;
        let key = TokenKey::from_pkcs8_der(&der, &[KeyUsage::Sign])?;
        Ok(Self {
            key,
            public_key: public_key.to_owned(),
        })
    }

    /// [`VapidSigner::new`] over a stored key pair.
    pub fn from_key_pair(key_pair: &VapidKeyPair) -> Result<Self, VapidError> {
        Self::new(&key_pair.public_key, &key_pair.private_key)
    }

    /// `Authorization` header value for a push to `audience`, issued now.
    pub fn authorize(&self, audience: &str, subject: &str) -> Result<String, VapidError> {
        self.authorize_at(audience, subject, Utc::now().timestamp())
    }

    /// [`authorize`](Self::authorize) with an explicit issue time (seconds since the epoch).
    pub fn authorize_at(&self, audience: &str, subject: &str, now: i64) -> Result<String, VapidError> {
        let claims = VapidClaims {
            aud: audience.to_owned(),
            exp: now + TOKEN_LIFETIME_SECS,
            sub: subject.to_owned(),
        };
        let token = CompactToken::sign(&TokenHeader::jwt(Algorithm::ES256), &claims, &self.key)?;
        debug!(aud = %claims.aud, exp = claims.exp, "issued vapid token");
        Ok(format!("vapid t={token}, k={}", self.public_key))
    }
}

/// Build the `Authorization` header value for a push to `audience`.
///
/// # Errors
///
/// Same as [`VapidSigner::new`].
pub fn authorize(
    audience: &str,
    subject: &str,
    public_key: &str,
    private_key: &str,
) -> Result<String, VapidError> {
    VapidSigner::new(public_key, private_key)?.authorize(audience, subject)
}

/// [`authorize`] with an explicit issue time (seconds since the epoch).
pub fn authorize_at(
    audience: &str,
    subject: &str,
    public_key: &str,
    private_key: &str,
    now: i64,
) -> Result<String, VapidError> {
    VapidSigner::new(public_key, private_key)?.authorize_at(audience, subject, now)
}

/// A parsed `vapid t=..., k=...` header, as a push service would see it.
#[derive(Debug, Clone)]
pub struct VapidAuthorization {
    pub token: CompactToken<VapidClaims>,
    pub public_key: String,
}

impl VapidAuthorization {
    /// Split a header value into its token and key parameters.
    ///
    /// # Errors
    ///
    /// Returns [`VapidError::Malformed`] for a missing scheme or parameter.
    pub fn parse(header: &str) -> Result<Self, VapidError> {
        let params = header
            .trim()
            .strip_prefix("vapid ")
            .ok_or(VapidError::Malformed("expected `vapid` scheme"))?;

        let mut token = None;
        let mut public_key = None;
        for param in params.split(',') {
            match param.trim().split_once('=') {
                Some(("t", v)) => token = Some(v.trim()),
                Some(("k", v)) => public_key = Some(v.trim()),
                _ => {}
            }
        }
        let token = token.ok_or(VapidError::Malformed("missing t= parameter"))?;
        let public_key = public_key.ok_or(VapidError::Malformed("missing k= parameter"))?;
        Ok(Self {
            token: CompactToken::new(token),
            public_key: public_key.to_owned(),
        })
    }

    /// Check the token signature against `k=` and that it has not expired at `now`.
    ///
    /// Returns `Ok(false)` for a bad signature, a non-ES256 header, or an
    /// expired token.
    pub fn verify_at(&self, now: i64) -> Result<bool, VapidError> {
        if self.token.header()?.algorithm()? != Algorithm::ES256 {
            return Ok(false);
        }
        let key = TokenKey::from_public_bytes(&ByteSequence::from_base64url(&self.public_key)?)?;
        if !self.token.verify(&key)? {
            return Ok(false);
        }
        Ok(self.token.payload()?.exp > now)
    }

    /// [`verify_at`](Self::verify_at) against the current time.
    pub fn verify(&self) -> Result<bool, VapidError> {
        self.verify_at(Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUD: &str = "https://fcm.googleapis.com";
    const SUB: &str = "mailto:ops@example.com";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn key_pair_encodings() {
        let kp = generate_key_pair().unwrap();
        let public = ByteSequence::from_base64url(&kp.public_key).unwrap();
        assert_eq!(public.len(), 65);
        assert_eq!(public[0], 0x04);
        assert!(!kp.public_key.contains('='));

        let der = ByteSequence::from_base64(&kp.private_key).unwrap();
        let key = TokenKey::from_pkcs8_der(&der, &[KeyUsage::Sign]).unwrap();
        assert_eq!(key.public_key_bytes().unwrap(), public.to_vec());
    }

    #[test]
    fn header_shape() {
        let kp = generate_key_pair().unwrap();
        let header = authorize_at(AUD, SUB, &kp.public_key, &kp.private_key, NOW).unwrap();
        assert!(header.starts_with("vapid t="));
        assert!(header.ends_with(&format!(", k={}", kp.public_key)));

        let auth = VapidAuthorization::parse(&header).unwrap();
        assert_eq!(auth.public_key, kp.public_key);

        let segments: Vec<&str> = auth.token.as_str().split('.').collect();
        assert_eq!(segments.len(), 3);
        let header_json = ByteSequence::from_base64url(segments[0]).unwrap().to_text().unwrap();
        assert_eq!(header_json, r#"{"typ":"JWT","alg":"ES256"}"#);
        assert_eq!(
            auth.token.payload().unwrap(),
            &VapidClaims {
                aud: AUD.into(),
                exp: NOW + 43_200,
                sub: SUB.into(),
            }
        );
        assert_eq!(auth.token.signature().unwrap().len(), 64);
    }

    #[test]
    fn issued_token_verifies_until_expiry() {
        let kp = generate_key_pair().unwrap();
        let header = authorize_at(AUD, SUB, &kp.public_key, &kp.private_key, NOW).unwrap();
        let auth = VapidAuthorization::parse(&header).unwrap();
        assert!(auth.verify_at(NOW).unwrap());
        assert!(auth.verify_at(NOW + TOKEN_LIFETIME_SECS - 1).unwrap());
        assert!(!auth.verify_at(NOW + TOKEN_LIFETIME_SECS).unwrap());
    }

    #[test]
    fn fresh_token_verifies_now() {
        let kp = generate_key_pair().unwrap();
        let header = authorize(AUD, SUB, &kp.public_key, &kp.private_key).unwrap();
        assert!(VapidAuthorization::parse(&header).unwrap().verify().unwrap());
    }

    #[test]
    fn token_from_other_key_fails() {
        let signer = generate_key_pair().unwrap();
        let other = generate_key_pair().unwrap();
        let header = authorize_at(AUD, SUB, &other.public_key, &signer.private_key, NOW).unwrap();
        let auth = VapidAuthorization::parse(&header).unwrap();
        assert!(!auth.verify_at(NOW).unwrap());
    }

    #[test]
    fn bad_private_key_rejected() {
        let kp = generate_key_pair().unwrap();
        let err = authorize_at(AUD, SUB, &kp.public_key, "not base64!", NOW).unwrap_err();
        assert!(matches!(err, VapidError::Codec(_)));
        assert_eq!(PushError::from(err).code(), "decoding_error");

        let err = authorize_at(AUD, SUB, &kp.public_key, "AAAA", NOW).unwrap_err();
        assert!(matches!(err, VapidError::Token(TokenError::InvalidKey(_))));
    }

    #[test]
    fn signer_reuses_imported_key() {
        let kp = generate_key_pair().unwrap();
        let signer = VapidSigner::from_key_pair(&kp).unwrap();
        for aud in [AUD, "https://updates.push.services.mozilla.com"] {
            let header = signer.authorize_at(aud, SUB, NOW).unwrap();
            let auth = VapidAuthorization::parse(&header).unwrap();
            assert_eq!(auth.token.payload().unwrap().aud, aud);
            assert!(auth.verify_at(NOW).unwrap());
        }
    }

    #[test]
    fn parse_rejects_malformed_headers() {
        assert!(matches!(
            VapidAuthorization::parse("Bearer abc"),
            Err(VapidError::Malformed(_))
        ));
        assert!(matches!(
            VapidAuthorization::parse("vapid k=abc"),
            Err(VapidError::Malformed(_))
        ));
        assert!(matches!(
            VapidAuthorization::parse("vapid t=a.b.c"),
            Err(VapidError::Malformed(_))
        ));
    }
}
