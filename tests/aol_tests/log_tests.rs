//! Tests for the Append-Only Log
//!
//! These tests verify:
//! - Single-entry and batched appends
//! - Ordinal reads in append order, Eof past the end
//! - Persistence across reopen, including appends after a partial scan
//! - Closed-log behavior
//! - Batches from concurrent writers never interleave

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use laydb::aol::{Batch, Log};
use laydb::LayError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("test.aol");
    (temp_dir, log_path)
}

fn read_all(log: &Log) -> Vec<Vec<u8>> {
    let mut entries = Vec::new();
    for ordinal in 0u64.. {
        match log.read(ordinal) {
            Ok(payload) => entries.push(payload),
            Err(LayError::Eof) => break,
            Err(e) => panic!("unexpected error at ordinal {}: {}", ordinal, e),
        }
    }
    entries
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_parent_and_file() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("nested").join("dir").join("data.aol");

    let log = Log::open(&log_path).unwrap();

    assert!(log_path.exists());
    assert_eq!(log.path(), log_path.as_path());
    assert_eq!(log.size(), 0);
    assert_eq!(log.entry_count().unwrap(), 0);
}

#[test]
fn test_read_empty_log_is_eof() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();

    assert!(matches!(log.read(0), Err(LayError::Eof)));
}

// =============================================================================
// Write / Read Tests
// =============================================================================

#[test]
fn test_write_single_entry_layout() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();

    log.write(b"hello").unwrap();

    assert_eq!(fs::read(&log_path).unwrap(), vec![5, b'h', b'e', b'l', b'l', b'o']);
    assert_eq!(log.size(), 6);
}

#[test]
fn test_write_then_read_in_order() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();

    for i in 0..20 {
        log.write(format!("entry-{}", i).as_bytes()).unwrap();
    }

    for i in 0..20u64 {
        assert_eq!(log.read(i).unwrap(), format!("entry-{}", i).into_bytes());
    }
    assert!(matches!(log.read(20), Err(LayError::Eof)));
    assert_eq!(log.entry_count().unwrap(), 20);
}

#[test]
fn test_reads_can_go_backwards() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    log.write(b"a").unwrap();
    log.write(b"b").unwrap();
    log.write(b"c").unwrap();

    assert_eq!(log.read(2).unwrap(), b"c".to_vec());
    assert_eq!(log.read(0).unwrap(), b"a".to_vec());
    assert_eq!(log.read(1).unwrap(), b"b".to_vec());
}

#[test]
fn test_empty_and_large_payloads() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    let large = vec![0xABu8; 70_000];

    log.write(b"").unwrap();
    log.write(&large).unwrap();

    assert_eq!(log.read(0).unwrap(), Vec::<u8>::new());
    assert_eq!(log.read(1).unwrap(), large);
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_write_batch_appends_all_entries() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    log.write(b"first").unwrap();

    let mut batch = Batch::new();
    batch.write(b"b0");
    batch.write(b"b1");
    batch.write(b"b2");
    log.write_batch(&mut batch).unwrap();

    assert!(batch.is_empty(), "batch is cleared after a successful append");
    assert_eq!(
        read_all(&log),
        vec![b"first".to_vec(), b"b0".to_vec(), b"b1".to_vec(), b"b2".to_vec()]
    );
}

#[test]
fn test_write_empty_batch_is_noop() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();

    let mut batch = Batch::new();
    log.write_batch(&mut batch).unwrap();

    assert_eq!(log.size(), 0);
    assert_eq!(log.entry_count().unwrap(), 0);
}

#[test]
fn test_batch_reused_after_append() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    let mut batch = Batch::new();

    batch.write(b"x");
    log.write_batch(&mut batch).unwrap();
    batch.write(b"y");
    log.write_batch(&mut batch).unwrap();

    assert_eq!(read_all(&log), vec![b"x".to_vec(), b"y".to_vec()]);
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_entries_survive_reopen() {
    let (_temp, log_path) = setup_temp_log();
    {
        let log = Log::open(&log_path).unwrap();
        log.write(b"one").unwrap();
        log.write(b"two").unwrap();
        log.close().unwrap();
    }

    let log = Log::open(&log_path).unwrap();
    assert_eq!(read_all(&log), vec![b"one".to_vec(), b"two".to_vec()]);

    log.write(b"three").unwrap();
    assert_eq!(log.read(2).unwrap(), b"three".to_vec());
}

#[test]
fn test_append_after_partial_scan() {
    let (_temp, log_path) = setup_temp_log();
    {
        let log = Log::open(&log_path).unwrap();
        log.write(b"e0").unwrap();
        log.write(b"e1").unwrap();
        log.write(b"e2").unwrap();
    }

    let log = Log::open(&log_path).unwrap();
    // Only the first entry has been scanned when the append happens
    assert_eq!(log.read(0).unwrap(), b"e0".to_vec());
    log.write(b"e3").unwrap();

    assert_eq!(log.read(3).unwrap(), b"e3".to_vec());
    assert_eq!(log.read(1).unwrap(), b"e1".to_vec());
    assert_eq!(log.entry_count().unwrap(), 4);
}

// =============================================================================
// Sync / Close Tests
// =============================================================================

#[test]
fn test_sync_open_log() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    log.write(b"data").unwrap();

    log.sync().unwrap();
}

#[test]
fn test_operations_after_close_fail_closed() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    log.write(b"data").unwrap();

    log.close().unwrap();

    assert!(log.is_closed());
    assert!(matches!(log.write(b"more"), Err(LayError::Closed)));
    assert!(matches!(log.read(0), Err(LayError::Closed)));
    assert!(matches!(log.sync(), Err(LayError::Closed)));
    assert!(matches!(log.entry_count(), Err(LayError::Closed)));
    assert!(matches!(log.close(), Err(LayError::Closed)));
}

#[test]
fn test_write_batch_after_close_leaves_log_unchanged() {
    let (_temp, log_path) = setup_temp_log();
    let log = Log::open(&log_path).unwrap();
    log.write(b"kept").unwrap();
    log.close().unwrap();

    let mut batch = Batch::new();
    batch.write(b"lost-1");
    batch.write(b"lost-2");
    assert!(matches!(log.write_batch(&mut batch), Err(LayError::Closed)));
    assert_eq!(batch.len(), 2, "failed batch is not cleared");

    let reopened = Log::open(&log_path).unwrap();
    assert_eq!(reopened.entry_count().unwrap(), 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_batches_do_not_interleave() {
    let (_temp, log_path) = setup_temp_log();
    let log = Arc::new(Log::open(&log_path).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                let mut batch = Batch::new();
                for b in 0..10 {
                    for i in 0..5 {
                        batch.write(format!("{}:{}:{}", t, b, i).as_bytes());
                    }
                    log.write_batch(&mut batch).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entries: Vec<String> = read_all(&log)
        .into_iter()
        .map(|e| String::from_utf8(e).unwrap())
        .collect();
    assert_eq!(entries.len(), 4 * 10 * 5);

    for chunk in entries.chunks(5) {
        let (prefix, _) = chunk[0].rsplit_once(':').unwrap();
        for (i, entry) in chunk.iter().enumerate() {
            assert_eq!(entry, &format!("{}:{}", prefix, i));
        }
    }
}
