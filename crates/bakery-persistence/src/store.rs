//! ---
//! bakery_section: "03-persistence-logging"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Timestamped and latest CSV artifact storage."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bakery_sim::{Batch, Reading};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tempfile::{Builder as TempBuilder, NamedTempFile};
use tracing::{debug, info};

use crate::codec::{decode_readings, encode_batch};
use crate::{PersistenceError, Result};

/// Highest numeric suffix tried when a timestamped name is already taken.
const MAX_NAME_SUFFIX: u32 = 999;

/// Result of persisting one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    /// Bare file name of the timestamped artifact.
    pub filename: String,
    /// Full path of the timestamped artifact.
    pub path: PathBuf,
    /// Full path of the fixed "latest" artifact.
    pub latest_path: PathBuf,
    /// Number of data rows written (header excluded).
    pub rows: usize,
}

/// Writes batches into a single output directory.
///
/// Both files go through a temp file in the same directory and are renamed into place, so
/// readers never observe a partially written artifact.
#[derive(Debug)]
pub struct ArtifactStore {
    directory: PathBuf,
    prefix: String,
    latest_name: String,
    latest_lock: Mutex<()>,
}

impl ArtifactStore {
    /// Create a store rooted at `directory`. Nothing is touched on disk until the first write.
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        latest_name: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            latest_name: latest_name.into(),
            latest_lock: Mutex::new(()),
        }
    }

    /// Output directory holding every artifact.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the fixed "latest" artifact.
    pub fn latest_path(&self) -> PathBuf {
        self.directory.join(&self.latest_name)
    }

    /// Persist a batch stamped with the current local time.
    pub fn persist(&self, batch: &Batch) -> Result<ReportArtifact> {
        self.persist_at(batch, Local::now())
    }

    /// Persist a batch using `at` for the timestamped name.
    ///
    /// Same-second collisions get `_1`, `_2`, ... suffixes; a name is only claimed when no
    /// file exists under it, so an earlier artifact is never replaced.
    pub fn persist_at(&self, batch: &Batch, at: DateTime<Local>) -> Result<ReportArtifact> {
        let contents = encode_batch(batch)?;
        fs::create_dir_all(&self.directory)?;

        let stamp = at.format("%Y%m%d_%H%M%S").to_string();
        let (filename, path) = self.claim_timestamped(&stamp, &contents)?;

        let latest_path = self.latest_path();
        {
            let _guard = self.latest_lock.lock();
            let staged = self.stage(&contents)?;
            staged
                .persist(&latest_path)
                .map_err(|err| PersistenceError::Io(err.error))?;
        }

        info!(
            artifact = %filename,
            latest = %latest_path.display(),
            rows = batch.len(),
            "batch persisted"
        );
        Ok(ReportArtifact {
            filename,
            path,
            latest_path,
            rows: batch.len(),
        })
    }

    fn claim_timestamped(&self, stamp: &str, contents: &[u8]) -> Result<(String, PathBuf)> {
        let mut staged = self.stage(contents)?;
        for suffix in 0..=MAX_NAME_SUFFIX {
            let filename = if suffix == 0 {
                format!("{}_{stamp}.csv", self.prefix)
            } else {
                format!("{}_{stamp}_{suffix}.csv", self.prefix)
            };
            let path = self.directory.join(&filename);
            match staged.persist_noclobber(&path) {
                Ok(_) => return Ok((filename, path)),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(candidate = %filename, "artifact name taken; trying next suffix");
                    staged = err.file;
                }
                Err(err) => return Err(err.error.into()),
            }
        }
        Err(PersistenceError::NameExhausted(format!(
            "{}_{stamp}",
            self.prefix
        )))
    }

    fn stage(&self, contents: &[u8]) -> Result<NamedTempFile> {
        let mut staged = TempBuilder::new()
            .prefix(".staging-")
            .suffix(".tmp")
            .tempfile_in(&self.directory)?;
        staged.write_all(contents)?;
        staged.as_file().sync_all()?;
        Ok(staged)
    }

    /// Resolve a bare artifact name inside the output directory.
    pub fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        if !is_bare_name(name) {
            return Err(PersistenceError::InvalidName(name.to_owned()));
        }
        let path = self.directory.join(name);
        if !path.is_file() {
            return Err(PersistenceError::NotFound(name.to_owned()));
        }
        Ok(path)
    }

    /// Raw bytes of a persisted artifact.
    pub fn read_artifact_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.artifact_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(PersistenceError::NotFound(name.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Decode a persisted artifact.
    pub fn read_artifact(&self, name: &str) -> Result<Vec<Reading>> {
        decode_readings(&self.read_artifact_bytes(name)?)
    }

    /// Decode the fixed "latest" artifact.
    pub fn read_latest(&self) -> Result<Vec<Reading>> {
        let name = self.latest_name.clone();
        self.read_artifact(&name)
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().map(|f| f == name).unwrap_or(false)
}
