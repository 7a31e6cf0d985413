//! Store Module
//!
//! The store handle that ties the log, the index and the transaction manager
//! together.
//!
//! ## Responsibilities
//! - Open the log and replay it into the index on startup
//! - Hand out read-only and writable transactions
//! - Persist committed batches before they touch the index
//! - Close the log on shutdown

mod transaction;

pub use transaction::Transaction;

use std::fs;
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::aol::{Batch, Log};
use crate::config::Config;
use crate::error::{LayError, Result};
use crate::index::{Index, MemIndex};
use crate::record::Record;
use crate::recovery::{self, RecoveryStats};

/// State guarded by the database lock
pub(crate) struct State<I> {
    pub(crate) index: I,
    pub(crate) closed: bool,
}

/// An embedded key-value store backed by an append-only log
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Read-only transactions** hold the shared side of `state` for their
///   whole lifetime. Any number run at once.
/// - **Writable transactions** hold the exclusive side from `begin` until
///   `commit`/`rollback`. At most one exists; it blocks other writers and
///   new readers.
/// - **Log**: internal mutex per operation. Only a writer holding the
///   exclusive side ever appends, so commit batches never interleave.
///
/// Index mutation happens only under the exclusive side, so the index itself
/// needs no lock of its own.
pub struct Store<I: Index = MemIndex> {
    /// Store configuration
    config: Config,

    /// Database lock around the index and the closed flag
    pub(crate) state: RwLock<State<I>>,

    /// Append-only log; `None` for in-memory stores
    pub(crate) log: Option<Log>,

    /// Commit buffer reused across writable transactions
    commit_batch: Mutex<Batch>,

    /// Outcome of the startup replay
    recovery: RecoveryStats,
}

impl Store<MemIndex> {
    /// Open or create a store with the default index
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_index(config, MemIndex::new())
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::builder().data_dir(path.as_ref()).build())
    }

    /// A store that keeps everything in memory
    pub fn in_memory() -> Result<Self> {
        Self::open(Config::in_memory())
    }
}

impl<I: Index> Store<I> {
    /// Name of the log file inside the data directory
    pub const LOG_FILENAME: &'static str = "laydb.aol";

    /// Open a store around a caller-supplied index
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Open/create the data directory and the log file
    /// 3. Replay the log into the (cleared) index
    /// 4. Ready to serve transactions
    pub fn open_with_index(config: Config, mut index: I) -> Result<Self> {
        config.validate()?;
        index.clear();

        let (log, recovery) = match &config.data_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let log = Log::open(dir.join(Self::LOG_FILENAME))?;
                let stats = recovery::replay(&log, &mut index)?;
                (Some(log), stats)
            }
            None => (None, RecoveryStats::default()),
        };

        info!(
            persistent = log.is_some(),
            live_keys = index.len(),
            "store opened"
        );

        Ok(Self {
            config,
            state: RwLock::new(State {
                index,
                closed: false,
            }),
            log,
            commit_batch: Mutex::new(Batch::new()),
            recovery,
        })
    }

    /// Start a transaction
    ///
    /// Read-only transactions share the database lock; a writable one takes
    /// it exclusively and blocks until the current writer finishes.
    /// All transactions must end with `commit` or `rollback` (dropping one
    /// rolls it back).
    pub fn begin(&self, writable: bool) -> Result<Transaction<'_, I>> {
        Transaction::begin(self, writable)
    }

    /// Run `f` inside a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, I>) -> Result<T>,
    {
        self.managed(false, f)
    }

    /// Run `f` inside a writable transaction, committing if it succeeds
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, I>) -> Result<T>,
    {
        self.managed(true, f)
    }

    /// Error from `f` rolls back; otherwise writable commits and read-only
    /// rolls back
    fn managed<T, F>(&self, writable: bool, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, I>) -> Result<T>,
    {
        let mut tx = self.begin(writable)?;
        match f(&mut tx) {
            Ok(value) => {
                if writable {
                    tx.commit()?;
                } else {
                    tx.rollback()?;
                }
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback();
                Err(err)
            }
        }
    }

    // =========================================================================
    // Single-operation conveniences
    // =========================================================================

    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.view(|tx| tx.get(key))
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.update(|tx| tx.set(key, value))
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.update(|tx| tx.delete(key))
    }

    /// Number of live keys
    pub fn len(&self) -> Result<usize> {
        let state = self.state.read();
        if state.closed {
            return Err(LayError::DatabaseClosed);
        }
        Ok(state.index.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Close the store
    ///
    /// Waits for the current writer, marks the store closed and closes the
    /// log. Later `begin` calls fail with `DatabaseClosed`.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.closed {
            return Err(LayError::DatabaseClosed);
        }
        state.closed = true;
        info!("store closed");

        match &self.log {
            Some(log) => log.close(),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// The underlying log, if the store is persistent
    pub fn log(&self) -> Option<&Log> {
        self.log.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Statistics from the replay that ran in `open`
    pub fn recovery_stats(&self) -> &RecoveryStats {
        &self.recovery
    }

    // =========================================================================
    // Internal helpers (called by transactions)
    // =========================================================================

    pub(crate) fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() || key.len() > self.config.max_key_size {
            return Err(LayError::InvalidKey);
        }
        Ok(())
    }

    pub(crate) fn check_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.config.max_value_size {
            return Err(LayError::InvalidEntry(format!(
                "value of {} bytes exceeds limit of {}",
                value.len(),
                self.config.max_value_size
            )));
        }
        Ok(())
    }

    /// Encode `records` into one batch and append it durably
    ///
    /// Caller holds the exclusive database lock.
    pub(crate) fn persist(&self, records: &[Record]) -> Result<()> {
        let log = match &self.log {
            Some(log) => log,
            None => return Ok(()),
        };
        if records.is_empty() {
            return Ok(());
        }

        let mut batch = self.commit_batch.lock();
        batch.clear();
        let result = records
            .iter()
            .try_for_each(|record| batch.write_record(record))
            .and_then(|_| log.write_batch(&mut batch));
        batch.clear();
        result
    }
}
