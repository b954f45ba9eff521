//! Signing keys tagged with role, usages, and algorithm family.
//!
//! The metadata lives beside the raw key so `sign`/`verify` can refuse misuse
//! before touching any key material.

use hmac::{digest::KeyInit, Hmac, Mac};
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use sha2::{Sha256, Sha384, Sha512};

use super::algorithm::{Algorithm, AlgorithmFamily, HashWidth};
use super::TokenError;

/// Which half of a key pair (or a shared secret) a key is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Asymmetric public half: verify only.
    Public,
    /// Asymmetric private half: sign.
    Private,
    /// Symmetric secret (HMAC): sign and verify.
    Secret,
}

/// Capability granted to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    /// May produce signatures.
    Sign,
    /// May check signatures.
    Verify,
}

#[derive(Clone)]
enum KeyMaterial {
    EcdsaSigning(SigningKey),
    EcdsaVerifying(VerifyingKey),
    Hmac(Vec<u8>),
}

/// A key usable with [`CompactToken`](super::CompactToken).
#[derive(Clone)]
pub struct TokenKey {
    role: KeyRole,
    usages: Vec<KeyUsage>,
    family: AlgorithmFamily,
    material: KeyMaterial,
}

impl TokenKey {
    /// Wrap a P-256 signing key as an ECDSA private key.
    pub fn ecdsa_private(signing_key: SigningKey, usages: &[KeyUsage]) -> Self {
        Self {
            role: KeyRole::Private,
            usages: usages.to_vec(),
            family: AlgorithmFamily::Es,
            material: KeyMaterial::EcdsaSigning(signing_key),
        }
    }

    /// Wrap a P-256 verifying key as an ECDSA public key with `verify` usage.
    pub fn ecdsa_public(verifying_key: VerifyingKey) -> Self {
        Self {
            role: KeyRole::Public,
            usages: vec![KeyUsage::Verify],
            family: AlgorithmFamily::Es,
            material: KeyMaterial::EcdsaVerifying(verifying_key),
        }
    }

    /// Import a PKCS#8 DER-encoded P-256 private key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKey`] if the DER is not a P-256 PKCS#8 key.
    pub fn from_pkcs8_der(der: &[u8], usages: &[KeyUsage]) -> Result<Self, TokenError> {
        let signing_key = SigningKey::from_pkcs8_der(der)
            .map_err(|e| TokenError::InvalidKey(format!("pkcs8 import failed: {e}")))?;
        Ok(Self::ecdsa_private(signing_key, usages))
    }

    /// Import a raw SEC1 (uncompressed or compressed) P-256 public key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKey`] if the bytes are not a curve point.
    pub fn from_public_bytes(sec1: &[u8]) -> Result<Self, TokenError> {
        let verifying_key = VerifyingKey::from_sec1_bytes(sec1)
            .map_err(|_| TokenError::InvalidKey("not a P-256 public key".into()))?;
        Ok(Self::ecdsa_public(verifying_key))
    }

    /// Wrap a shared HMAC secret.
    pub fn hmac(secret: impl Into<Vec<u8>>, usages: &[KeyUsage]) -> Self {
        Self {
            role: KeyRole::Secret,
            usages: usages.to_vec(),
            family: AlgorithmFamily::Hs,
            material: KeyMaterial::Hmac(secret.into()),
        }
    }

    /// Role of this key.
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// Whether `usage` was granted.
    pub fn has_usage(&self, usage: KeyUsage) -> bool {
        self.usages.contains(&usage)
    }

    /// Native algorithm name, e.g. `ECDSA`.
    pub fn algorithm_name(&self) -> &'static str {
        self.family.name()
    }

    /// Public half of an ECDSA private key; `None` for public or HMAC keys.
    pub fn public_key(&self) -> Option<TokenKey> {
        match &self.material {
            KeyMaterial::EcdsaSigning(sk) => Some(Self::ecdsa_public(VerifyingKey::from(sk))),
            _ => None,
        }
    }

    /// Uncompressed SEC1 public point (65 bytes) for ECDSA keys.
    pub fn public_key_bytes(&self) -> Option<Vec<u8>> {
        let vk = match &self.material {
            KeyMaterial::EcdsaSigning(sk) => VerifyingKey::from(sk),
            KeyMaterial::EcdsaVerifying(vk) => vk.clone(),
            KeyMaterial::Hmac(_) => return None,
        };
        Some(vk.to_encoded_point(false).as_bytes().to_vec())
    }

    /// PKCS#8 DER export of an ECDSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKey`] for non-ECDSA-private keys or if encoding fails.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, TokenError> {
        match &self.material {
            KeyMaterial::EcdsaSigning(sk) => sk
                .to_pkcs8_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| TokenError::InvalidKey(format!("pkcs8 export failed: {e}"))),
            _ => Err(TokenError::InvalidKey("only ECDSA private keys export as PKCS#8".into())),
        }
    }

    /// Refuse signing unless role, usage, and family all line up with `alg`.
    pub(crate) fn check_sign(&self, alg: &Algorithm) -> Result<(), TokenError> {
        if !matches!(self.role, KeyRole::Private | KeyRole::Secret) {
            return Err(TokenError::KeyUsage("key must be private"));
        }
        if !self.has_usage(KeyUsage::Sign) {
            return Err(TokenError::KeyUsage("key must have sign usage"));
        }
        self.check_family(alg)
    }

    /// Refuse verification unless role, usage, and family all line up with `alg`.
    pub(crate) fn check_verify(&self, alg: &Algorithm) -> Result<(), TokenError> {
        if !matches!(self.role, KeyRole::Public | KeyRole::Secret) {
            return Err(TokenError::KeyUsage("key must be public"));
        }
        if !self.has_usage(KeyUsage::Verify) {
            return Err(TokenError::KeyUsage("key must have verify usage"));
        }
        self.check_family(alg)
    }

    fn check_family(&self, alg: &Algorithm) -> Result<(), TokenError> {
        if self.family.name() != alg.name() {
            return Err(TokenError::KeyUsage("key algorithm mismatch"));
        }
        Ok(())
    }

    /// Sign `message`; ECDSA signatures are raw `r‖s` (64 bytes).
    pub(crate) fn sign_bytes(&self, alg: &Algorithm, message: &[u8]) -> Result<Vec<u8>, TokenError> {
        match (&self.material, alg.hash) {
            (KeyMaterial::EcdsaSigning(sk), HashWidth::Sha256) => {
                let signature: Signature = sk.sign(message);
                Ok(signature.to_bytes().to_vec())
            }
            (KeyMaterial::Hmac(secret), HashWidth::Sha256) => mac::<Hmac<Sha256>>(secret, message),
            (KeyMaterial::Hmac(secret), HashWidth::Sha384) => mac::<Hmac<Sha384>>(secret, message),
            (KeyMaterial::Hmac(secret), HashWidth::Sha512) => mac::<Hmac<Sha512>>(secret, message),
            _ => Err(TokenError::UnsupportedAlgorithm(alg.to_string())),
        }
    }

    /// Check `signature` over `message`. A bad signature is `Ok(false)`.
    pub(crate) fn verify_bytes(
        &self,
        alg: &Algorithm,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, TokenError> {
        match (&self.material, alg.hash) {
            (KeyMaterial::EcdsaVerifying(vk), HashWidth::Sha256) => {
                let Ok(signature) = Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(vk.verify(message, &signature).is_ok())
            }
            (KeyMaterial::Hmac(secret), HashWidth::Sha256) => {
                mac_verify::<Hmac<Sha256>>(secret, message, signature)
            }
            (KeyMaterial::Hmac(secret), HashWidth::Sha384) => {
                mac_verify::<Hmac<Sha384>>(secret, message, signature)
            }
            (KeyMaterial::Hmac(secret), HashWidth::Sha512) => {
                mac_verify::<Hmac<Sha512>>(secret, message, signature)
            }
            _ => Err(TokenError::UnsupportedAlgorithm(alg.to_string())),
        }
    }
}

fn mac<M: Mac + KeyInit>(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut m = <M as KeyInit>::new_from_slice(secret)
        .map_err(|_| TokenError::InvalidKey("hmac key rejected".into()))?;
    m.update(message);
    Ok(m.finalize().into_bytes().to_vec())
}

fn mac_verify<M: Mac + KeyInit>(
    secret: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, TokenError> {
    let mut m = <M as KeyInit>::new_from_slice(secret)
        .map_err(|_| TokenError::InvalidKey("hmac key rejected".into()))?;
    m.update(message);
    Ok(m.verify_slice(signature).is_ok())
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material is never printed.
        f.debug_struct("TokenKey")
            .field("role", &self.role)
            .field("usages", &self.usages)
            .field("algorithm", &self.family.name())
            .finish_non_exhaustive()
    }
}
