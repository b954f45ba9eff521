//! Key schedule: ECDH + HKDF into a content key and nonce base.

use hkdf::Hkdf;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;

use super::{EceError, KEY_LEN, NONCE_LEN};

const WEBPUSH_INFO: &[u8] = b"WebPush: info\0";
const KEY_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// Length of the combined webpush secret fed to the content key schedule.
pub const SECRET_LEN: usize = 32;

/// Largest record sequence number that fits in the 48-bit nonce counter.
pub const MAX_SEQUENCE: u64 = (1 << 48) - 1;

/// Combined secret derived from the key agreement and auth secret.
pub struct WebPushSecret(pub [u8; SECRET_LEN]);

impl Drop for WebPushSecret {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for WebPushSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebPushSecret([REDACTED])")
    }
}

/// Content encryption key and nonce base for one message.
pub struct ContentKeys {
    pub key: [u8; KEY_LEN],
    pub nonce_base: [u8; NONCE_LEN],
}

impl Drop for ContentKeys {
    fn drop(&mut self) {
        self.key.iter_mut().for_each(|b| *b = 0);
        self.nonce_base.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for ContentKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKeys([REDACTED])")
    }
}

/// Derive the webpush secret.
///
/// `local` is this side's private key and `remote` the peer's public key.
/// `receiver_pub` and `sender_pub` are the raw uncompressed points of the
/// subscriber and the application server respectively, whichever side we are.
///
/// # Errors
///
/// Returns [`EceError::MissingAuthSecret`] if `auth_secret` is empty.
pub fn webpush_secret(
    local: &SecretKey,
    remote: &PublicKey,
    receiver_pub: &[u8],
    sender_pub: &[u8],
    auth_secret: &[u8],
) -> Result<WebPushSecret, EceError> {
    if auth_secret.is_empty() {
        return Err(EceError::MissingAuthSecret);
    }
    let shared = p256::ecdh::diffie_hellman(local.to_nonzero_scalar(), remote.as_affine());
    let hk = Hkdf::<Sha256>::new(Some(auth_secret), shared.raw_secret_bytes().as_slice());
    let mut out = [0u8; SECRET_LEN];
    hk.expand_multi_info(&[WEBPUSH_INFO, receiver_pub, sender_pub], &mut out)
        .map_err(|e| EceError::Invariant(format!("webpush secret expand: {e}")))?;
    Ok(WebPushSecret(out))
}

/// Derive the content key and nonce base from the header salt and secret.
///
/// # Errors
///
/// Only fails if HKDF rejects the output length, which cannot happen for
/// the fixed sizes used here.
pub fn content_keys(salt: &[u8], secret: &WebPushSecret) -> Result<ContentKeys, EceError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), &secret.0);
    let mut keys = ContentKeys {
        key: [0u8; KEY_LEN],
        nonce_base: [0u8; NONCE_LEN],
    };
    hk.expand(KEY_INFO, &mut keys.key)
        .map_err(|e| EceError::Invariant(format!("content key expand: {e}")))?;
    hk.expand(NONCE_INFO, &mut keys.nonce_base)
        .map_err(|e| EceError::Invariant(format!("nonce expand: {e}")))?;
    Ok(keys)
}

/// Nonce for record `seq`: the base with its low 48 bits XORed by `seq`.
///
/// # Errors
///
/// Returns [`EceError::Invariant`] if `seq` exceeds [`MAX_SEQUENCE`].
pub fn record_nonce(base: &[u8; NONCE_LEN], seq: u64) -> Result<[u8; NONCE_LEN], EceError> {
    if seq > MAX_SEQUENCE {
        return Err(EceError::Invariant(format!(
            "record sequence {seq} overflows the 48-bit nonce counter"
        )));
    }
    let mut nonce = *base;
    let counter = seq.to_be_bytes();
    nonce[NONCE_LEN - 6..]
        .iter_mut()
        .zip(&counter[2..])
        .for_each(|(n, c)| *n ^= c);
    Ok(nonce)
}
