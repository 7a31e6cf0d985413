//! # LayDB
//!
//! An embedded, single-node key-value store with:
//! - An append-only log (AOL) as the durability source of truth
//! - Transactions that commit as one atomic, fsynced batch
//! - Log-replay recovery that rebuilds the in-memory index on open
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store                                 │
//! │          begin(false) ──► shared lock (readers)              │
//! │          begin(true)  ──► exclusive lock (one writer)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ commit
//!          ┌────────────┴────────────┐
//!          │ 1. append batch + fsync │ 2. apply records
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     AOL     │ replay   │    Index    │
//!   │  (durable)  │ ───────► │ (volatile)  │
//!   └─────────────┘ on open  └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use laydb::{Config, Store};
//!
//! let store = Store::open(Config::builder().data_dir("/tmp/laydb").build())?;
//!
//! let mut tx = store.begin(true)?;
//! tx.set(b"hello", b"world")?;
//! tx.commit()?;
//!
//! assert_eq!(store.get(b"hello")?, b"world".to_vec());
//! store.close()?;
//! # Ok::<(), laydb::LayError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod aol;
pub mod index;
pub mod recovery;
pub mod store;
pub mod maintenance;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LayError, Result};
pub use config::Config;
pub use index::{Index, MemIndex};
pub use maintenance::{CompactionStats, Compactor};
pub use record::Record;
pub use recovery::RecoveryStats;
pub use store::{Store, Transaction};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LayDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
