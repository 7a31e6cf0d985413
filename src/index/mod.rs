//! Index Module
//!
//! The in-memory view of the store: every key maps to its current value.
//! Volatile and fully rebuildable from the append-only log.
//!
//! ## Responsibilities
//! - Exact-key insert, remove and lookup
//! - Ordered enumeration of live entries (used by compaction and `keys`)
//! - Applying decoded records with the tombstone convention
//!
//! ## Data Structure Choice
//! The store only depends on the [`Index`] trait; any associative structure
//! (ordered map, hash map, trie) satisfies it. [`MemIndex`] is the default
//! and uses a BTreeMap so enumeration comes out sorted.
//!
//! Implementations need no internal locking: the store only mutates the
//! index while holding its exclusive database lock.

mod mem;

pub use mem::MemIndex;

use crate::record::Record;

/// Key → value map consumed by the store
pub trait Index: Send + Sync {
    /// Insert or replace the value for `key`
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Remove `key`, returning whether it was present
    fn remove(&mut self, key: &[u8]) -> bool;

    /// Current value for `key`, if any
    fn lookup(&self, key: &[u8]) -> Option<&[u8]>;

    /// All live entries
    fn enumerate(&self) -> Box<dyn Iterator<Item = (&[u8], &[u8])> + '_>;

    /// Number of live keys
    fn len(&self) -> usize;

    /// Drop every entry
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one record: a value inserts, an empty value removes the key
    fn apply(&mut self, record: Record) {
        if record.is_tombstone() {
            self.remove(&record.key);
        } else {
            self.insert(record.key, record.value);
        }
    }
}
