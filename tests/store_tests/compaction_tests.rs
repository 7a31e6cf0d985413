//! Tests for log compaction
//!
//! These tests verify:
//! - Compaction keeps exactly one record per live key
//! - Data is unchanged before and after compaction, and after reopen
//! - Appends after compaction land in the new log
//! - The background compactor runs on its period and stops on close

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use laydb::{CompactionStats, Compactor, Config, LayError, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(temp_dir: &TempDir) -> Config {
    Config::builder().data_dir(temp_dir.path()).build()
}

/// 10 keys, key0 overwritten 5 more times, key1 deleted: 16 log entries
fn populate(store: &Store) {
    for i in 0..10 {
        store
            .set(format!("key{}", i).as_bytes(), format!("v{}", i).as_bytes())
            .unwrap();
    }
    for round in 0..5 {
        store
            .set(b"key0", format!("v0-{}", round).as_bytes())
            .unwrap();
    }
    store.delete(b"key1").unwrap();
}

fn entry_count(store: &Store) -> u64 {
    store.log().unwrap().entry_count().unwrap()
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_compact_keeps_one_entry_per_live_key() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp_dir)).unwrap();
    populate(&store);
    assert_eq!(entry_count(&store), 16);

    let stats = store.compact().unwrap();

    assert_eq!(stats.entries_before, 16);
    assert_eq!(stats.entries_after, 9);
    assert!(stats.bytes_after < stats.bytes_before);
    assert_eq!(entry_count(&store), 9);
    assert_eq!(store.log().unwrap().size(), stats.bytes_after);
}

#[test]
fn test_compact_preserves_data() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Store::open(config_for(&temp_dir)).unwrap();
        populate(&store);
        store.compact().unwrap();

        assert_eq!(store.get(b"key0").unwrap(), b"v0-4".to_vec());
        assert!(matches!(store.get(b"key1"), Err(LayError::NotFound)));
        assert_eq!(store.get(b"key9").unwrap(), b"v9".to_vec());
        store.close().unwrap();
    }

    let store = Store::open(config_for(&temp_dir)).unwrap();
    assert_eq!(store.len().unwrap(), 9);
    assert_eq!(store.recovery_stats().entries_replayed, 9);
    assert_eq!(store.recovery_stats().tombstones_applied, 0);
    assert_eq!(store.get(b"key0").unwrap(), b"v0-4".to_vec());
    assert!(matches!(store.get(b"key1"), Err(LayError::NotFound)));
}

#[test]
fn test_writes_after_compaction() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Store::open(config_for(&temp_dir)).unwrap();
        populate(&store);
        store.compact().unwrap();

        store.set(b"after", b"compaction").unwrap();
        assert_eq!(entry_count(&store), 10);
        assert_eq!(store.log().unwrap().read(9).unwrap().len(), 12 + 5 + 10);
        store.close().unwrap();
    }

    let store = Store::open(config_for(&temp_dir)).unwrap();
    assert_eq!(store.get(b"after").unwrap(), b"compaction".to_vec());
    assert_eq!(store.len().unwrap(), 10);
}

#[test]
fn test_compact_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp_dir)).unwrap();
    store.set(b"k", b"v").unwrap();
    store.delete(b"k").unwrap();

    let stats = store.compact().unwrap();

    assert_eq!(stats.entries_before, 2);
    assert_eq!(stats.entries_after, 0);
    assert_eq!(stats.bytes_after, 0);
    assert_eq!(entry_count(&store), 0);
}

#[test]
fn test_compact_in_memory_store() {
    let store = Store::in_memory().unwrap();
    store.set(b"k", b"v").unwrap();

    assert_eq!(store.compact().unwrap(), CompactionStats::default());
    assert_eq!(store.get(b"k").unwrap(), b"v".to_vec());
}

#[test]
fn test_compact_closed_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp_dir)).unwrap();
    store.close().unwrap();

    assert!(matches!(store.compact(), Err(LayError::DatabaseClosed)));
}

#[test]
fn test_compaction_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(config_for(&temp_dir)).unwrap();
    populate(&store);
    store.compact().unwrap();

    let names: Vec<String> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![Store::<laydb::MemIndex>::LOG_FILENAME.to_string()]);
}

// =============================================================================
// Background Compactor Tests
// =============================================================================

#[test]
fn test_compactor_runs_periodically() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(config_for(&temp_dir)).unwrap());
    populate(&store);

    let compactor = Compactor::spawn(Arc::clone(&store), Duration::from_millis(20)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while entry_count(&store) != 9 {
        assert!(Instant::now() < deadline, "compactor never ran");
        thread::sleep(Duration::from_millis(10));
    }
    compactor.shutdown();

    assert_eq!(store.get(b"key0").unwrap(), b"v0-4".to_vec());
}

#[test]
fn test_compactor_stops_after_store_close() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(config_for(&temp_dir)).unwrap());

    let compactor = Compactor::spawn(Arc::clone(&store), Duration::from_millis(10)).unwrap();
    store.close().unwrap();
    thread::sleep(Duration::from_millis(50));

    // Joins the already-finished thread
    compactor.shutdown();
}

#[test]
fn test_compactor_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(config_for(&temp_dir)).unwrap());
    assert!(Compactor::from_config(Arc::clone(&store)).unwrap().is_none());

    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .compaction_interval(Duration::from_millis(50))
        .build();
    let store = Arc::new(Store::open(config).unwrap());
    let compactor = Compactor::from_config(Arc::clone(&store)).unwrap();
    assert!(compactor.is_some());
}

#[test]
fn test_zero_interval_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(config_for(&temp_dir)).unwrap());
    assert!(matches!(
        Compactor::spawn(store, Duration::ZERO),
        Err(LayError::Config(_))
    ));

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .compaction_interval(Duration::ZERO)
        .build();
    assert!(matches!(Store::open(config), Err(LayError::Config(_))));
}
