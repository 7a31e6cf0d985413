//! Maintenance Module
//!
//! Log compaction and the background job that runs it.
//!
//! Compaction is an ordinary writer: it takes the exclusive database lock,
//! so it serializes with writable transactions and waits for readers.
//! It rewrites the log as one record per live key, which also drops every
//! deleted key from disk.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use tracing::{debug, error, info, warn};

use crate::aol::Batch;
use crate::error::{LayError, Result};
use crate::index::Index;
use crate::record::{now_timestamp, Record};
use crate::store::Store;

/// Outcome of one compaction run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompactionStats {
    pub entries_before: u64,
    pub entries_after: u64,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl<I: Index> Store<I> {
    /// Rewrite the log so it holds exactly one record per live key
    ///
    /// Surviving records are restamped with the time of the run; their
    /// original timestamps are not kept.
    /// In-memory stores have nothing to compact and return zeroed stats.
    pub fn compact(&self) -> Result<CompactionStats> {
        let state = self.state.write();
        if state.closed {
            return Err(LayError::DatabaseClosed);
        }
        let log = match &self.log {
            Some(log) => log,
            None => return Ok(CompactionStats::default()),
        };

        let entries_before = log.entry_count()?;
        let bytes_before = log.size();

        let timestamp = now_timestamp();
        let mut batch = Batch::with_capacity(state.index.len(), bytes_before as usize);
        for (key, value) in state.index.enumerate() {
            batch.write_record(&Record::new(key, value, timestamp))?;
        }
        let entries_after = batch.len() as u64;

        log.rewrite(&mut batch)?;

        let stats = CompactionStats {
            entries_before,
            entries_after,
            bytes_before,
            bytes_after: log.size(),
        };
        info!(
            entries_before = stats.entries_before,
            entries_after = stats.entries_after,
            bytes_before = stats.bytes_before,
            bytes_after = stats.bytes_after,
            "log compacted"
        );
        Ok(stats)
    }
}

/// Background thread running `Store::compact` on a fixed period
///
/// Stops on `shutdown`, on drop, or once the store is closed.
pub struct Compactor {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Compactor {
    /// Start a compactor if the store's config asks for one
    pub fn from_config<I: Index + 'static>(store: Arc<Store<I>>) -> Result<Option<Self>> {
        match store.config().compaction_interval {
            Some(interval) => Self::spawn(store, interval).map(Some),
            None => Ok(None),
        }
    }

    pub fn spawn<I: Index + 'static>(store: Arc<Store<I>>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(LayError::Config(
                "compaction interval must be non-zero".to_string(),
            ));
        }

        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("laydb-compactor".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "compactor started");
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => match store.compact() {
                            Ok(stats) => debug!(entries_after = stats.entries_after, "scheduled compaction done"),
                            Err(LayError::DatabaseClosed) => {
                                info!("store closed, compactor exiting");
                                break;
                            }
                            Err(err) => warn!(error = %err, "scheduled compaction failed"),
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                info!("compactor stopped");
            })?;

        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
        })
    }

    /// Signal the job to stop and wait for it
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("compactor thread panicked");
            }
        }
    }
}

impl Drop for Compactor {
    fn drop(&mut self) {
        self.stop();
    }
}
