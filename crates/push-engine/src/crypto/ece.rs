//! Record-level encryption and decryption of `aes128gcm` bodies.

use aes_gcm::{
    aead::{consts::U12, rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes128Gcm, Nonce,
};
use common::ByteSequence;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use tracing::debug;

use super::derive::{content_keys, record_nonce, webpush_secret, ContentKeys};
use super::{EceError, EceHeader, PAD_SIZE, RECORD_OVERHEAD, RECORD_SIZE, SALT_LEN, TAG_LEN};

/// Key material supplied either raw or as base64url text.
#[derive(Debug, Clone, Copy)]
pub enum KeyInput<'a> {
    Base64Url(&'a str),
    Raw(&'a [u8]),
}

impl KeyInput<'_> {
    fn decode(&self) -> Result<Vec<u8>, EceError> {
        match self {
            KeyInput::Base64Url(s) => Ok(ByteSequence::from_base64url(s)?.into_vec()),
            KeyInput::Raw(b) => Ok(b.to_vec()),
        }
    }
}

impl<'a> From<&'a str> for KeyInput<'a> {
    fn from(s: &'a str) -> Self {
        KeyInput::Base64Url(s)
    }
}

impl<'a> From<&'a [u8]> for KeyInput<'a> {
    fn from(b: &'a [u8]) -> Self {
        KeyInput::Raw(b)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for KeyInput<'a> {
    fn from(b: &'a [u8; N]) -> Self {
        KeyInput::Raw(b)
    }
}

/// Inputs for [`encrypt`].
#[derive(Debug, Clone, Copy)]
pub struct EncryptParams<'a> {
    /// Receiver's public key (the subscription's `p256dh`).
    pub dh: KeyInput<'a>,
    /// Sender's private key. Its public point becomes the header keyid.
    pub private_key: &'a SecretKey,
    /// 16-byte header salt.
    pub salt: KeyInput<'a>,
    /// Receiver's authentication secret (the subscription's `auth`).
    pub auth_secret: KeyInput<'a>,
}

/// Inputs for [`decrypt`]. Salt, record size and sender key come from the header.
#[derive(Debug, Clone, Copy)]
pub struct DecryptParams<'a> {
    /// Receiver's private key.
    pub private_key: &'a SecretKey,
    /// Receiver's authentication secret.
    pub auth_secret: KeyInput<'a>,
}

/// Fresh random 16-byte salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Encrypt `plaintext` into a complete `aes128gcm` body.
///
/// Data is split into records of `RECORD_SIZE - 17` bytes; the record whose
/// slice reaches the end of the input is the last one. Empty input still
/// yields a single 17-byte record.
///
/// # Errors
///
/// Validation-class [`EceError`]s for bad salt, key, or auth secret.
/// [`EceError::Invariant`] if a non-final record is not exactly `rs` bytes,
/// a tag has the wrong length, or the nonce counter overflows.
pub fn encrypt(plaintext: &[u8], params: &EncryptParams<'_>) -> Result<Vec<u8>, EceError> {
    let salt_bytes = params.salt.decode()?;
    let salt: [u8; SALT_LEN] = salt_bytes
        .as_slice()
        .try_into()
        .map_err(|_| EceError::InvalidSalt(salt_bytes.len()))?;
    let receiver_pub = params.dh.decode()?;
    let receiver = PublicKey::from_sec1_bytes(&receiver_pub).map_err(|_| EceError::InvalidPublicKey)?;
    let auth_secret = params.auth_secret.decode()?;

    let sender_point = params.private_key.public_key().to_encoded_point(false);
    let header = EceHeader {
        salt,
        rs: RECORD_SIZE,
        keyid: sender_point.as_bytes().to_vec(),
    };
    let mut out = header.write()?;

    let secret = webpush_secret(
        params.private_key,
        &receiver,
        &receiver_pub,
        sender_point.as_bytes(),
        &auth_secret,
    )?;
    let keys = content_keys(&header.salt, &secret)?;
    let cipher = build_cipher(&keys)?;

    let rs = header.rs as usize;
    let capacity = rs - RECORD_OVERHEAD;
    let mut start = 0usize;
    let mut seq = 0u64;
    loop {
        let end = plaintext.len().min(start + capacity);
        let last = start + capacity >= plaintext.len();
        let record = seal_record(&cipher, &keys, seq, &plaintext[start..end])?;
        if !last && record.len() != rs {
            return Err(EceError::Invariant(format!(
                "unable to pad record {seq} to {rs} bytes (got {})",
                record.len()
            )));
        }
        out.extend_from_slice(&record);
        if last {
            break;
        }
        start = end;
        seq += 1;
    }

    debug!(
        plaintext_len = plaintext.len(),
        records = seq + 1,
        body_len = out.len(),
        "encrypted aes128gcm body"
    );
    Ok(out)
}

/// Decrypt a complete `aes128gcm` body addressed to `params.private_key`.
///
/// # Errors
///
/// [`EceError::Truncated`] / [`EceError::InvalidRecordSize`] for a malformed
/// header, [`EceError::Authentication`] if any record fails its tag check,
/// [`EceError::InvalidPadding`] for non-zero padding.
pub fn decrypt(body: &[u8], params: &DecryptParams<'_>) -> Result<Vec<u8>, EceError> {
    let (header, offset) = EceHeader::parse(body)?;
    let sender = PublicKey::from_sec1_bytes(&header.keyid).map_err(|_| EceError::InvalidPublicKey)?;
    let auth_secret = params.auth_secret.decode()?;
    let receiver_point = params.private_key.public_key().to_encoded_point(false);

    let secret = webpush_secret(
        params.private_key,
        &sender,
        receiver_point.as_bytes(),
        &header.keyid,
        &auth_secret,
    )?;
    let keys = content_keys(&header.salt, &secret)?;
    let cipher = build_cipher(&keys)?;

    let records = &body[offset..];
    if records.is_empty() {
        return Err(EceError::Truncated("no records"));
    }

    let mut out = Vec::with_capacity(records.len());
    for (seq, record) in (0u64..).zip(records.chunks(header.rs as usize)) {
        if record.len() < RECORD_OVERHEAD {
            return Err(EceError::Truncated("record"));
        }
        let nonce = record_nonce(&keys.nonce_base, seq)?;
        let padded = cipher
            .decrypt(Nonce::<U12>::from_slice(&nonce), record)
            .map_err(|_| EceError::Authentication(seq))?;
        out.extend_from_slice(unpad(&padded, seq)?);
    }

    debug!(body_len = body.len(), plaintext_len = out.len(), "decrypted aes128gcm body");
    Ok(out)
}

fn build_cipher(keys: &ContentKeys) -> Result<Aes128Gcm, EceError> {
    Aes128Gcm::new_from_slice(&keys.key)
        .map_err(|_| EceError::Invariant("content key has wrong length".to_owned()))
}

fn seal_record(
    cipher: &Aes128Gcm,
    keys: &ContentKeys,
    seq: u64,
    chunk: &[u8],
) -> Result<Vec<u8>, EceError> {
    let nonce = record_nonce(&keys.nonce_base, seq)?;
    let mut padded = Vec::with_capacity(PAD_SIZE + chunk.len());
    padded.push(0u8);
    padded.extend_from_slice(chunk);

    let sealed = cipher
        .encrypt(Nonce::<U12>::from_slice(&nonce), padded.as_slice())
        .map_err(|_| EceError::Invariant(format!("aead seal failed for record {seq}")))?;
    if sealed.len() != padded.len() + TAG_LEN {
        return Err(EceError::Invariant(format!(
            "invalid tag length for record {seq}"
        )));
    }
    Ok(sealed)
}

fn unpad(padded: &[u8], seq: u64) -> Result<&[u8], EceError> {
    let (&pad_len, rest) = padded
        .split_first()
        .ok_or(EceError::InvalidPadding(seq))?;
    let pad_len = pad_len as usize;
    if pad_len > rest.len() || rest[..pad_len].iter().any(|b| *b != 0) {
        return Err(EceError::InvalidPadding(seq));
    }
    Ok(&rest[pad_len..])
}
