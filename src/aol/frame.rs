//! Entry framing
//!
//! Unsigned varint length prefix followed by the raw payload.

use bytes::BufMut;

/// Longest possible encoding of a u64 varint
pub const MAX_VARINT_LEN: usize = 10;

/// Append `x` as an unsigned LEB128 varint, returning the bytes written
pub fn put_uvarint<B: BufMut>(buf: &mut B, mut x: u64) -> usize {
    let mut written = 1;
    while x >= 0x80 {
        buf.put_u8((x as u8) | 0x80);
        x >>= 7;
        written += 1;
    }
    buf.put_u8(x as u8);
    written
}

/// Decode an unsigned varint from the start of `buf`
///
/// Returns the value and the number of bytes consumed, or `None` if the
/// buffer ends mid-varint or the encoding overflows a u64.
pub fn uvarint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut x: u64 = 0;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return None;
        }
        if byte < 0x80 {
            // 10th byte may only carry the top bit of a u64
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return None;
            }
            return Some((x | (byte as u64) << shift, i + 1));
        }
        x |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
    }
    None
}

/// Append one framed entry, returning (header_len, payload_len)
pub fn append_frame<B: BufMut>(buf: &mut B, payload: &[u8]) -> (usize, usize) {
    let header_len = put_uvarint(buf, payload.len() as u64);
    buf.put_slice(payload);
    (header_len, payload.len())
}
