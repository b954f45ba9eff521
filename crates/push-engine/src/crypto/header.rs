//! The `aes128gcm` body header: salt, record size, and sender key id.

use super::{EceError, RECORD_OVERHEAD, SALT_LEN};

/// Fixed-width part of the header: salt + rs + idlen.
const FIXED_LEN: usize = SALT_LEN + 4 + 1;

/// Parameters carried in front of the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EceHeader {
    /// Per-message random salt.
    pub salt: [u8; SALT_LEN],
    /// Ciphertext bytes per record.
    pub rs: u32,
    /// Sender's raw public key.
    pub keyid: Vec<u8>,
}

impl EceHeader {
    /// Serialise as `salt | rs (BE) | idlen | keyid`.
    ///
    /// # Errors
    ///
    /// Returns [`EceError::KeyIdTooLarge`] if `keyid` exceeds 255 bytes.
    pub fn write(&self) -> Result<Vec<u8>, EceError> {
        let idlen = u8::try_from(self.keyid.len())
            .map_err(|_| EceError::KeyIdTooLarge(self.keyid.len()))?;
        let mut out = Vec::with_capacity(FIXED_LEN + self.keyid.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.rs.to_be_bytes());
        out.push(idlen);
        out.extend_from_slice(&self.keyid);
        Ok(out)
    }

    /// Parse a header from the front of `body`, returning it and its length.
    ///
    /// # Errors
    ///
    /// [`EceError::Truncated`] if `body` is shorter than the header it declares;
    /// [`EceError::InvalidRecordSize`] if `rs` cannot hold one data byte.
    pub fn parse(body: &[u8]) -> Result<(Self, usize), EceError> {
        if body.len() < FIXED_LEN {
            return Err(EceError::Truncated("header"));
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&body[..SALT_LEN]);
        let mut rs_bytes = [0u8; 4];
        rs_bytes.copy_from_slice(&body[SALT_LEN..SALT_LEN + 4]);
        let rs = u32::from_be_bytes(rs_bytes);
        if (rs as usize) <= RECORD_OVERHEAD {
            return Err(EceError::InvalidRecordSize(rs));
        }
        let idlen = body[SALT_LEN + 4] as usize;
        let end = FIXED_LEN + idlen;
        if body.len() < end {
            return Err(EceError::Truncated("keyid"));
        }
        let keyid = body[FIXED_LEN..end].to_vec();
        Ok((Self { salt, rs, keyid }, end))
    }
}
