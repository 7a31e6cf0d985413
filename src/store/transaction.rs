//! Transactions
//!
//! A transaction is either read-only or read-write. Writes are staged in a
//! private list and only reach the log (and then the index) on commit.
//!
//! ## Lifecycle
//! ```text
//!   begin(false) ──► active-readonly ──rollback──► rolled-back
//!   begin(true)  ──► active-writable ──commit────► committed
//!                                    └─rollback──► rolled-back
//! ```
//! Once committed or rolled back, every operation fails with `TxClosed`.

use std::mem;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::error::{LayError, Result};
use crate::index::{Index, MemIndex};
use crate::record::Record;

use super::{State, Store};

/// The side of the database lock a transaction holds
enum Guard<'db, I> {
    Read(RwLockReadGuard<'db, State<I>>),
    Write(RwLockWriteGuard<'db, State<I>>),
}

impl<'db, I> Guard<'db, I> {
    fn state(&self) -> &State<I> {
        match self {
            Guard::Read(state) => &**state,
            Guard::Write(state) => &**state,
        }
    }
}

/// A read-only or read-write transaction on a [`Store`]
///
/// Reads resolve against the index as of the transaction's own lock
/// acquisition. A transaction does not see its own staged writes before
/// commit.
pub struct Transaction<'db, I: Index = MemIndex> {
    store: &'db Store<I>,

    writable: bool,

    /// `None` once committed or rolled back
    guard: Option<Guard<'db, I>>,

    /// Staged records, in staging order
    staged: Vec<Record>,
}

impl<'db, I: Index> Transaction<'db, I> {
    pub(crate) fn begin(store: &'db Store<I>, writable: bool) -> Result<Self> {
        let guard = if writable {
            Guard::Write(store.state.write())
        } else {
            Guard::Read(store.state.read())
        };

        // Returning drops the guard, releasing the lock
        if guard.state().closed {
            return Err(LayError::DatabaseClosed);
        }

        Ok(Self {
            store,
            writable,
            guard: Some(guard),
            staged: Vec::new(),
        })
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether the transaction can still be used
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    /// Number of records staged so far
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    // =========================================================================
    // Writes (staged)
    // =========================================================================

    /// Stage a key/value pair
    ///
    /// An empty value follows the tombstone convention and deletes the key
    /// on commit.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.store.check_key(key)?;
        self.store.check_value(value)?;

        self.staged.push(Record::put(key, value));
        Ok(())
    }

    /// Stage a tombstone for `key`
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.store.check_key(key)?;

        self.staged.push(Record::tombstone(key));
        Ok(())
    }

    // =========================================================================
    // Reads (index)
    // =========================================================================

    /// Committed value for `key`
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let state = self.state()?;
        if key.is_empty() {
            return Err(LayError::InvalidKey);
        }
        state
            .index
            .lookup(key)
            .map(<[u8]>::to_vec)
            .ok_or(LayError::NotFound)
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(LayError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// All live keys, in index enumeration order
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let state = self.state()?;
        Ok(state.index.enumerate().map(|(k, _)| k.to_vec()).collect())
    }

    /// Number of live keys
    pub fn len(&self) -> Result<usize> {
        Ok(self.state()?.index.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Persist the staged records as one batch, then apply them to the index
    ///
    /// If the log append fails the transaction is rolled back and the index
    /// is left untouched. Read-only transactions cannot commit.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_writable()?;

        let staged = mem::take(&mut self.staged);
        if let Err(err) = self.store.persist(&staged) {
            warn!(records = staged.len(), error = %err, "commit failed, rolling back");
            self.guard = None;
            return Err(err);
        }

        if let Some(Guard::Write(state)) = self.guard.as_mut() {
            // Later records for the same key win, matching log order
            for record in staged {
                state.index.apply(record);
            }
        }
        self.guard = None;
        Ok(())
    }

    /// Discard staged records and release the lock
    pub fn rollback(&mut self) -> Result<()> {
        if self.guard.is_none() {
            return Err(LayError::TxClosed);
        }
        self.staged.clear();
        self.guard = None;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn state(&self) -> Result<&State<I>> {
        self.guard
            .as_ref()
            .map(Guard::state)
            .ok_or(LayError::TxClosed)
    }

    fn ensure_writable(&self) -> Result<()> {
        match &self.guard {
            None => Err(LayError::TxClosed),
            Some(Guard::Read(_)) => Err(LayError::TxNotWritable),
            Some(Guard::Write(_)) => Ok(()),
        }
    }
}

/// Rollback on drop comes from the `guard` field: dropping it releases the
/// lock, and the staged records are dropped unapplied.
impl<I: Index> Drop for Transaction<'_, I> {
    fn drop(&mut self) {
        if self.guard.is_some() && !self.staged.is_empty() {
            debug!(
                records = self.staged.len(),
                "transaction dropped while active, discarding staged writes"
            );
        }
    }
}
