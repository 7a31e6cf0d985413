//! Write batches
//!
//! A batch stages framed entries in one contiguous buffer so the log can
//! append them with a single write and a single fsync.

use bytes::BytesMut;

use crate::error::Result;
use crate::record::Record;

use super::frame::{append_frame, put_uvarint};

/// Layout of one staged entry inside a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntry {
    /// Bytes taken by the length prefix
    pub header_len: usize,
    /// Bytes of payload following the prefix
    pub payload_len: usize,
}

impl BatchEntry {
    pub fn frame_len(&self) -> usize {
        self.header_len + self.payload_len
    }
}

/// Ordered staging list of pending entries plus their concatenated bytes
///
/// Owned by a single writer. `clear` keeps the allocation so the buffer can
/// be reused for the next batch.
#[derive(Debug, Default)]
pub struct Batch {
    entries: Vec<BatchEntry>,
    data: BytesMut,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(entries: usize, bytes: usize) -> Self {
        Self {
            entries: Vec::with_capacity(entries),
            data: BytesMut::with_capacity(bytes),
        }
    }

    /// Stage one opaque payload
    pub fn write(&mut self, payload: &[u8]) {
        let (header_len, payload_len) = append_frame(&mut self.data, payload);
        self.entries.push(BatchEntry {
            header_len,
            payload_len,
        });
    }

    /// Stage an encoded record without an intermediate buffer
    ///
    /// On encode failure the batch is left as it was.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let mark = self.data.len();
        let payload_len = record.encoded_len();
        self.data.reserve(payload_len + super::MAX_VARINT_LEN);
        let header_len = put_uvarint(&mut self.data, payload_len as u64);
        if let Err(err) = record.encode_into(&mut self.data) {
            self.data.truncate(mark);
            return Err(err);
        }
        self.entries.push(BatchEntry {
            header_len,
            payload_len,
        });
        Ok(())
    }

    /// Drop all staged entries, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
        self.data.clear();
    }

    /// Number of staged entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total framed size in bytes
    pub fn size_in_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }
}
