//! Local history of the submissions made from this machine.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CacheError;
use crate::models::SubmissionRecord;

/// A JSON file holding the most recent submissions, oldest first.
#[derive(Debug, Clone)]
pub struct RecentCache {
    path: PathBuf,
    capacity: usize,
}

impl RecentCache {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored submissions, oldest first. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<SubmissionRecord>, CacheError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| CacheError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Appends `submission`, dropping the oldest entries beyond capacity.
    pub fn record(&self, submission: &SubmissionRecord) -> Result<(), CacheError> {
        let mut entries = self.load()?;
        entries.push(submission.clone());
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }

        let json = serde_json::to_string_pretty(&entries).map_err(|source| CacheError::Json {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_error(dir))?;

        // Readers only ever see the old file or the complete new one.
        let mut staged = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
        let staged_path = staged.path().to_path_buf();
        staged
            .write_all(json.as_bytes())
            .map_err(io_error(&staged_path))?;
        staged
            .as_file()
            .sync_all()
            .map_err(io_error(&staged_path))?;
        staged.persist(&self.path).map_err(|err| CacheError::Io {
            path: self.path.clone(),
            source: err.error,
        })?;

        debug!(path = %self.path.display(), entries = entries.len(), "recent cache updated");
        Ok(())
    }

    /// Up to `limit` submissions, newest first.
    pub fn latest(&self, limit: usize) -> Result<Vec<SubmissionRecord>, CacheError> {
        let entries = self.load()?;
        Ok(entries.into_iter().rev().take(limit).collect())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError {
    let path = path.to_path_buf();
    move |source| CacheError::Io { path, source }
}
