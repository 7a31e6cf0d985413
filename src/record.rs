//! Record Codec
//!
//! A record is the unit of durability: one key, one (possibly empty) value and
//! a producer-assigned timestamp. Records are encoded once at commit time and
//! never rewritten afterwards.
//!
//! ## Encoding (big-endian)
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬─────────┬───────────┐
//! │ key_size (4) │ val_size (4) │ timestamp(4) │   key   │   value   │
//! └──────────────┴──────────────┴──────────────┴─────────┴───────────┘
//! ```
//!
//! `val_size == 0` is the tombstone convention. The codec does not interpret
//! it; deciding what an empty value means is up to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};

use crate::error::{LayError, Result};

/// Fixed header: key_size (4) + value_size (4) + timestamp (4)
pub const HEADER_SIZE: usize = 12;

/// A single key/value pair with its timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Wall-clock seconds, truncated to 32 bits. Informational only:
    /// precedence between records follows log order.
    pub timestamp: u32,
}

impl Record {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, timestamp: u32) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            timestamp,
        }
    }

    /// Record carrying a value, stamped with the current time
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, value, now_timestamp())
    }

    /// Record with an empty value, stamped with the current time
    pub fn tombstone(key: impl Into<Vec<u8>>) -> Self {
        Self::new(key, Vec::new(), now_timestamp())
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    /// Size of the encoded form in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Encode into a freshly allocated buffer
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Encode by appending to `buf`
    ///
    /// Fails with `InvalidEntry` for an empty key or sizes that do not fit the
    /// 32-bit header fields. Nothing is written to `buf` on failure.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        if self.key.is_empty() {
            return Err(LayError::InvalidEntry("empty key".to_string()));
        }
        let key_size = u32::try_from(self.key.len())
            .map_err(|_| LayError::InvalidEntry(format!("key too large: {} bytes", self.key.len())))?;
        let value_size = u32::try_from(self.value.len()).map_err(|_| {
            LayError::InvalidEntry(format!("value too large: {} bytes", self.value.len()))
        })?;

        buf.put_u32(key_size);
        buf.put_u32(value_size);
        buf.put_u32(self.timestamp);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);
        Ok(())
    }

    /// Decode a record from the start of `bytes`
    ///
    /// Trailing bytes past `HEADER_SIZE + key_size + value_size` are ignored.
    /// Size fields that point past the end of the buffer are reported as
    /// `Corrupt`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(LayError::Corrupt(format!(
                "record header truncated: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut header = &bytes[..HEADER_SIZE];
        let key_size = header.get_u32() as usize;
        let value_size = header.get_u32() as usize;
        let timestamp = header.get_u32();

        let total = HEADER_SIZE as u64 + key_size as u64 + value_size as u64;
        if total > bytes.len() as u64 {
            return Err(LayError::Corrupt(format!(
                "record body truncated: header claims {} bytes, buffer has {}",
                total,
                bytes.len()
            )));
        }

        let key_end = HEADER_SIZE + key_size;
        Ok(Self {
            key: bytes[HEADER_SIZE..key_end].to_vec(),
            value: bytes[key_end..key_end + value_size].to_vec(),
            timestamp,
        })
    }
}

/// Current wall-clock time in seconds, truncated to 32 bits
pub fn now_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
