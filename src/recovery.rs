//! Log Recovery
//!
//! Rebuilds the index on startup by replaying the append-only log.
//!
//! Replay reads ordinals 0, 1, 2, ... in increasing order and stops at the
//! first `Eof`. Each payload is decoded as a record and applied with the
//! tombstone convention. Any corruption aborts replay; the caller must not
//! serve a partially loaded index.

use tracing::{debug, error, info};

use crate::aol::Log;
use crate::error::{LayError, Result};
use crate::index::Index;
use crate::record::Record;

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Log entries read and decoded
    pub entries_replayed: u64,

    /// Records that inserted a value
    pub values_applied: u64,

    /// Records that removed a key
    pub tombstones_applied: u64,

    /// Records with an empty key (ignored)
    pub empty_keys_skipped: u64,
}

/// Replay every entry of `log` into `index`, in append order
pub fn replay<I: Index + ?Sized>(log: &Log, index: &mut I) -> Result<RecoveryStats> {
    let mut stats = RecoveryStats::default();

    for ordinal in 0u64.. {
        let payload = match log.read(ordinal) {
            Ok(payload) => payload,
            Err(LayError::Eof) => break,
            Err(err) => {
                error!(ordinal, error = %err, "log replay aborted");
                return Err(err);
            }
        };

        let record = Record::decode(&payload).map_err(|err| {
            error!(ordinal, error = %err, "undecodable record in log");
            err
        })?;
        stats.entries_replayed += 1;

        if record.key.is_empty() {
            debug!(ordinal, "skipping record with empty key");
            stats.empty_keys_skipped += 1;
            continue;
        }

        if record.is_tombstone() {
            stats.tombstones_applied += 1;
        } else {
            stats.values_applied += 1;
        }
        index.apply(record);
    }

    info!(
        entries = stats.entries_replayed,
        values = stats.values_applied,
        tombstones = stats.tombstones_applied,
        live_keys = index.len(),
        "log replay complete"
    );
    Ok(stats)
}
