//! Append-Only Log (AOL) Module
//!
//! The durability source of truth: an ordered sequence of opaque byte entries
//! on stable storage. Entries are only ever appended, never rewritten in
//! place (compaction replaces the whole file atomically).
//!
//! ## Responsibilities
//! - Single-entry and batched append, each followed by one fsync
//! - Ordinal reads in append order (0, 1, 2, ...)
//! - Sticky corruption detection: a malformed entry disables the log
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 0                                 │
//! │ ┌─────────────────┬───────────────────┐ │
//! │ │ Len (uvarint)   │ Payload (Len)     │ │
//! │ └─────────────────┴───────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 1                                 │
//! │ ┌─────────────────┬───────────────────┐ │
//! │ │ Len (uvarint)   │ Payload (Len)     │ │
//! │ └─────────────────┴───────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The length prefix is an unsigned LEB128 varint of at most 10 bytes.

mod batch;
mod frame;
mod log;

pub use batch::{Batch, BatchEntry};
pub use frame::{append_frame, put_uvarint, uvarint, MAX_VARINT_LEN};
pub use log::Log;
