//! Staged writes of persisted artifacts.
//!
//! An artifact is first written completely to a temporary file in its destination directory,
//! then renamed over its target by [`StagedArtifact::commit`]. Staging several artifacts before
//! committing any of them keeps every write failure ahead of the first rename.
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;

use crate::lcindex_errors::LcIndexError;

/// A fully written and synced temporary file, not yet visible at `target`.
#[derive(Debug)]
pub struct StagedArtifact {
    tmp: NamedTempFile,
    target: Utf8PathBuf,
}

impl StagedArtifact {
    /// Temporary file next to `target`, ready to be filled.
    pub(crate) fn create(target: &Utf8Path) -> Result<StagedArtifact, LcIndexError> {
        Ok(StagedArtifact {
            tmp: NamedTempFile::new_in(parent_dir(target))?,
            target: target.to_path_buf(),
        })
    }

    pub(crate) fn file_mut(&mut self) -> &mut std::fs::File {
        self.tmp.as_file_mut()
    }

    pub(crate) fn sync(&self) -> Result<(), LcIndexError> {
        self.tmp.as_file().sync_all()?;
        Ok(())
    }

    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    /// Atomically replace the target with the staged content.
    pub fn commit(self) -> Result<(), LcIndexError> {
        self.tmp
            .persist(&self.target)
            .map_err(|e| LcIndexError::IoError(e.error))?;
        Ok(())
    }
}

pub(crate) fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    }
}
