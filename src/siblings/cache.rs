//! # Sibling Cache
//!
//! On-disk mapping from a record offset to its [`SiblingPair`], one file per raw lightcurve file,
//! shared by every process working on that file.
//!
//! ## Concurrency
//! -----------------
//! * **Writers** serialize on an advisory exclusive lock taken on a sidecar lock file
//!   (`<stem>.siblings.lock`). Under the lock a writer reads the current pairs and, if neither
//!   offset of its pair is already paired, appends one row. A pair once stored is never rewritten
//!   or dropped; only [`SiblingCache::invalidate`] removes the whole cache. The lock is released
//!   on every exit path.
//! * **Readers** take no lock. A reader racing an append may see a last row that is not yet
//!   complete; rows are only trusted up to the last line terminator, and the next writer cuts such
//!   a torn tail before appending.
//!
//! The lock file itself is never replaced, so every writer contends on the same inode.
//!
//! ## File format
//! -----------------
//! CSV rows `offset_a,offset_b,separation_arcsec` with `offset_a < offset_b`, in the order the
//! pairs were stored. No offset appears in more than one row.
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::constants::ByteOffset;
use crate::lcindex_errors::LcIndexError;

use super::SiblingPair;

#[derive(Debug, Clone, PartialEq)]
pub struct SiblingCache {
    path: Utf8PathBuf,
    lock_path: Utf8PathBuf,
}

/// Exclusive advisory lock held for the duration of a read-then-append.
struct CacheLock {
    file: Option<File>,
    path: Utf8PathBuf,
}

impl CacheLock {
    fn acquire(path: &Utf8Path) -> Result<CacheLock, LcIndexError> {
        let lock_error = |source| LcIndexError::Lock {
            path: path.to_path_buf(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(lock_error)?;
        FileExt::lock_exclusive(&file).map_err(lock_error)?;
        debug!(path = %path, "sibling cache lock acquired");
        Ok(CacheLock {
            file: Some(file),
            path: path.to_path_buf(),
        })
    }

    fn release(mut self) -> Result<(), LcIndexError> {
        match self.file.take() {
            Some(file) => FileExt::unlock(&file).map_err(|source| LcIndexError::Lock {
                path: self.path.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            // closing the descriptor releases the lock even if this fails
            let _ = FileExt::unlock(&file);
        }
    }
}

/// Complete rows of the cache file as read at one instant.
struct Snapshot {
    pairs: Vec<SiblingPair>,
    /// Byte length covered by complete rows.
    complete_len: u64,
    /// Byte length of the file, torn tail included.
    file_len: u64,
}

impl SiblingCache {
    pub fn new(path: impl Into<Utf8PathBuf>, lock_path: impl Into<Utf8PathBuf>) -> Self {
        SiblingCache {
            path: path.into(),
            lock_path: lock_path.into(),
        }
    }

    /// Cache of `raw_file` at the location chosen by `config`.
    pub fn for_raw_file(config: &IndexConfig, raw_file: &Utf8Path) -> Self {
        SiblingCache::new(
            config.siblings_path(raw_file),
            config.siblings_lock_path(raw_file),
        )
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Pair containing `offset`, read from the current snapshot without locking.
    pub fn lookup(&self, offset: ByteOffset) -> Result<Option<SiblingPair>, LcIndexError> {
        Ok(self
            .read_snapshot()?
            .pairs
            .into_iter()
            .find(|p| p.contains(offset)))
    }

    /// Every stored pair, in storage order.
    pub fn pairs(&self) -> Result<Vec<SiblingPair>, LcIndexError> {
        Ok(self.read_snapshot()?.pairs)
    }

    /// Record `pair` unless one of its offsets is already paired.
    ///
    /// Return
    /// ----------
    /// * The pair that holds after the call: `pair` itself if it was appended (or was already
    ///   stored), otherwise the earlier pair sharing one of its offsets, which is kept unchanged.
    /// * [`LcIndexError::Lock`] if the lock cannot be acquired or released,
    /// * [`LcIndexError::IndexCorrupt`] if the current cache cannot be parsed,
    /// * I/O errors from the append.
    pub fn store(&self, pair: SiblingPair) -> Result<SiblingPair, LcIndexError> {
        let lock = CacheLock::acquire(&self.lock_path)?;
        match self.store_locked(pair) {
            Ok(stored) => {
                lock.release()?;
                Ok(stored)
            }
            Err(e) => {
                drop(lock);
                Err(e)
            }
        }
    }

    /// Remove the cache, e.g. after the indexes of its raw file were rebuilt.
    pub fn invalidate(&self) -> Result<(), LcIndexError> {
        let lock = CacheLock::acquire(&self.lock_path)?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path, "sibling cache invalidated");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        lock.release()
    }

    fn store_locked(&self, pair: SiblingPair) -> Result<SiblingPair, LcIndexError> {
        let snapshot = self.read_snapshot()?;
        if let Some(existing) = snapshot
            .pairs
            .iter()
            .find(|p| p.contains(pair.offset_a) || p.contains(pair.offset_b))
        {
            if *existing != pair {
                debug!(
                    offset_a = pair.offset_a,
                    offset_b = pair.offset_b,
                    kept_a = existing.offset_a,
                    kept_b = existing.offset_b,
                    "offset already paired, keeping stored pair"
                );
            }
            return Ok(*existing);
        }

        self.append(&snapshot, pair)?;
        info!(
            path = %self.path,
            offset_a = pair.offset_a,
            offset_b = pair.offset_b,
            separation_arcsec = pair.separation_arcsec,
            "sibling saved"
        );
        Ok(pair)
    }

    fn append(&self, snapshot: &Snapshot, pair: SiblingPair) -> Result<(), LcIndexError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if snapshot.file_len > snapshot.complete_len {
            warn!(
                path = %self.path,
                bytes = snapshot.file_len - snapshot.complete_len,
                "dropping incomplete trailing row"
            );
            file.set_len(snapshot.complete_len)?;
        }
        {
            let mut w = BufWriter::new(&file);
            let mut csv_writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut w);
            csv_writer.serialize(pair)?;
            csv_writer.flush()?;
            drop(csv_writer);
            w.flush()?;
        }
        file.sync_data()?;
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Snapshot, LcIndexError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let complete = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |last| last + 1);

        let pairs = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(&bytes[..complete])
            .into_deserialize()
            .map(|row| {
                row.map_err(|e| LcIndexError::corrupt(&self.path, format!("unreadable pair: {e}")))
            })
            .collect::<Result<Vec<SiblingPair>, _>>()?;

        Ok(Snapshot {
            pairs,
            complete_len: complete as u64,
            file_len: bytes.len() as u64,
        })
    }
}
