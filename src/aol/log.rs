//! Append-only log file
//!
//! One file, one writer critical section. Every public operation takes the
//! internal mutex, so concurrent batch appends never interleave their bytes
//! and reads never observe a half-appended batch.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::error::{LayError, Result};

use super::batch::Batch;
use super::frame::{uvarint, MAX_VARINT_LEN};

/// Position of one entry's payload inside the file
#[derive(Debug, Clone, Copy)]
struct EntryPos {
    offset: u64,
    len: u64,
}

/// An append-only log of opaque byte entries
///
/// ## Read path
/// Ordinal reads go through an offset table (ordinal → payload position).
/// The table is extended by a forward-only scan the first time an ordinal
/// past its end is requested, and kept current by appends while it covers
/// the whole file. Ordering and error behavior match a full rescan from
/// byte 0 on every call.
pub struct Log {
    path: PathBuf,
    inner: Mutex<LogInner>,
}

struct LogInner {
    /// `None` once closed
    file: Option<File>,

    /// Reused for single-entry writes
    wbatch: Batch,

    /// Offset table for entries `0..positions.len()`
    positions: Vec<EntryPos>,

    /// Byte offset just past the last entry in `positions`
    indexed_end: u64,

    /// Current file length in bytes
    file_len: u64,

    closed: bool,
    corrupt: bool,
}

impl Log {
    /// Open (or create) the log at `path`
    ///
    /// The parent directory is created if needed. Existing content is kept
    /// untouched; it is validated lazily as entries are read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&path)?;
        let file_len = file.metadata()?.len();
        debug!(path = %path.display(), bytes = file_len, "opened append-only log");

        Ok(Self {
            path,
            inner: Mutex::new(LogInner {
                file: Some(file),
                wbatch: Batch::new(),
                positions: Vec::new(),
                indexed_end: 0,
                file_len,
                closed: false,
                corrupt: false,
            }),
        })
    }

    /// Append one entry and fsync
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_usable()?;

        let mut batch = std::mem::take(&mut inner.wbatch);
        batch.clear();
        batch.write(data);
        let result = inner.append(&self.path, &batch);
        batch.clear();
        inner.wbatch = batch;
        result
    }

    /// Append every staged entry as one contiguous write followed by one fsync
    ///
    /// Either the whole batch becomes durable or, on failure, the file is cut
    /// back to its previous length and the log is marked corrupt. The batch
    /// is cleared after a successful append. An empty batch is a no-op.
    pub fn write_batch(&self, batch: &mut Batch) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_usable()?;
        if batch.is_empty() {
            return Ok(());
        }

        inner.append(&self.path, batch)?;
        batch.clear();
        Ok(())
    }

    /// Payload of the `ordinal`-th entry (0-based, append order)
    ///
    /// Fails with `Eof` past the last entry and with `Corrupt` when a length
    /// prefix is unreadable, runs past the end of the file, or points at bytes
    /// the file no longer holds. Either failure disables the log.
    pub fn read(&self, ordinal: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.check_usable()?;

        let pos = inner.locate(&self.path, ordinal)?;
        let mut payload = vec![0u8; pos.len as usize];
        if let Err(err) = inner.read_exact_at(pos.offset, &mut payload) {
            return Err(inner.note_failure(&self.path, err));
        }
        Ok(payload)
    }

    /// Number of complete entries in the log
    pub fn entry_count(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        inner.check_usable()?;

        loop {
            match inner.scan_next() {
                Ok(Some(_)) => continue,
                Ok(None) => return Ok(inner.positions.len() as u64),
                Err(err) => return Err(inner.note_failure(&self.path, err)),
            }
        }
    }

    /// Force buffered data to stable storage
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_usable()?;

        let result = match inner.file.as_mut() {
            Some(file) => file.sync_all(),
            None => return Err(LayError::Closed),
        };
        result.map_err(|err| inner.note_failure(&self.path, err.into()))
    }

    /// Sync and close the file handle
    ///
    /// Closing twice returns `Closed`, or `Corrupt` if the log was corrupt.
    /// A corrupt log is still synced and closed, then reports `Corrupt`.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(inner.sticky_error());
        }

        let synced = match inner.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        };
        inner.closed = true;
        debug!(path = %self.path.display(), "closed append-only log");

        if let Err(err) = synced {
            inner.corrupt = true;
            return Err(err.into());
        }
        if inner.corrupt {
            return Err(inner.sticky_error());
        }
        Ok(())
    }

    /// Replace the whole log with the entries of `batch`
    ///
    /// Maintenance only. The new content is written to a sibling file,
    /// fsynced and renamed over the log, so a crash leaves either the old or
    /// the new log in place, never a mix.
    pub fn rewrite(&self, batch: &mut Batch) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_usable()?;

        let tmp_path = compact_path(&self.path);
        if let Err(err) = write_fresh(&tmp_path, batch.data()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        // Past this point the file on disk has changed; failures leave the
        // in-memory view unusable.
        let reopened = fs::rename(&tmp_path, &self.path)
            .and_then(|_| sync_parent_dir(&self.path))
            .and_then(|_| open_append(&self.path));
        let file = match reopened {
            Ok(file) => file,
            Err(err) => return Err(inner.note_failure(&self.path, err.into())),
        };

        inner.file = Some(file);
        inner.positions.clear();
        inner.indexed_end = 0;
        inner.file_len = 0;
        inner.index_appended(batch);
        batch.clear();
        Ok(())
    }

    /// File length in bytes
    pub fn size(&self) -> u64 {
        self.inner.lock().file_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn is_corrupt(&self) -> bool {
        self.inner.lock().corrupt
    }
}

impl LogInner {
    /// Corrupt wins over closed
    fn check_usable(&self) -> Result<()> {
        if self.corrupt || self.closed {
            return Err(self.sticky_error());
        }
        Ok(())
    }

    fn sticky_error(&self) -> LayError {
        if self.corrupt {
            LayError::Corrupt("log previously marked corrupt".to_string())
        } else {
            LayError::Closed
        }
    }

    /// Mark the log corrupt for structural and I/O failures, pass others through
    fn note_failure(&mut self, path: &Path, err: LayError) -> LayError {
        if matches!(err, LayError::Corrupt(_) | LayError::Io(_)) && !self.corrupt {
            self.corrupt = true;
            error!(path = %path.display(), error = %err, "append-only log marked corrupt");
        }
        err
    }

    fn append(&mut self, path: &Path, batch: &Batch) -> Result<()> {
        let base = self.file_len;
        let file = self.file.as_mut().ok_or(LayError::Closed)?;

        if let Err(err) = file.write_all(batch.data()).and_then(|_| file.sync_all()) {
            // Cut any partial bytes so no half-written entry is ever readable
            if let Err(trunc_err) = file.set_len(base) {
                warn!(path = %path.display(), error = %trunc_err, "failed to truncate partial batch");
            }
            return Err(self.note_failure(path, err.into()));
        }

        self.index_appended(batch);
        Ok(())
    }

    /// Account for a batch just appended at `file_len`
    fn index_appended(&mut self, batch: &Batch) {
        let base = self.file_len;
        self.file_len = base + batch.size_in_bytes() as u64;

        // A partially scanned table picks the new entries up on its next scan
        if self.indexed_end != base {
            return;
        }
        let mut offset = base;
        for entry in batch.entries() {
            self.positions.push(EntryPos {
                offset: offset + entry.header_len as u64,
                len: entry.payload_len as u64,
            });
            offset += entry.frame_len() as u64;
        }
        self.indexed_end = self.file_len;
    }

    fn locate(&mut self, path: &Path, ordinal: u64) -> Result<EntryPos> {
        let idx = usize::try_from(ordinal).map_err(|_| LayError::Eof)?;
        while self.positions.len() <= idx {
            match self.scan_next() {
                Ok(Some(_)) => {}
                Ok(None) => return Err(LayError::Eof),
                Err(err) => return Err(self.note_failure(path, err)),
            }
        }
        Ok(self.positions[idx])
    }

    /// Decode the frame starting at `indexed_end` and add it to the table
    fn scan_next(&mut self) -> Result<Option<EntryPos>> {
        if self.indexed_end >= self.file_len {
            return Ok(None);
        }

        let start = self.indexed_end;
        let remaining = self.file_len - start;
        let mut header = [0u8; MAX_VARINT_LEN];
        let n = remaining.min(MAX_VARINT_LEN as u64) as usize;
        self.read_exact_at(start, &mut header[..n])?;

        let (payload_len, header_len) = uvarint(&header[..n]).ok_or_else(|| {
            LayError::Corrupt(format!("unreadable length prefix at offset {}", start))
        })?;
        let available = remaining - header_len as u64;
        if payload_len > available {
            return Err(LayError::Corrupt(format!(
                "entry at offset {} claims {} bytes, only {} remain",
                start, payload_len, available
            )));
        }

        let pos = EntryPos {
            offset: start + header_len as u64,
            len: payload_len,
        };
        self.positions.push(pos);
        self.indexed_end = pos.offset + payload_len;
        Ok(Some(pos))
    }

    /// A short read means the file shrank under us and is reported as `Corrupt`
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        let file = self.file.as_mut().ok_or(LayError::Closed)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => LayError::Corrupt(format!(
                "log truncated: {} bytes at offset {} no longer present",
                len, offset
            )),
            _ => err.into(),
        })
    }
}

/// Reads seek freely; O_APPEND keeps every write at the end of the file
fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
}

fn write_fresh(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn compact_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".compact");
    path.with_file_name(name)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
