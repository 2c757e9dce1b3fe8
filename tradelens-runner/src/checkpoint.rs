//! Search checkpoints — periodic snapshots of the leaderboard.
//!
//! A long combination search hands its current leaderboard to a
//! `Checkpointer` every `checkpoint_interval` evaluations and once more when
//! it finishes or is cancelled. On start, a previously saved snapshot seeds
//! the leaderboard so a resumed search never reports fewer or worse
//! portfolios than the interrupted one had found.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::portfolio::PortfolioCandidate;

/// Current checkpoint schema version. Increment on breaking changes.
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("checkpoint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checkpoint schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Storage for leaderboard snapshots.
pub trait Checkpointer {
    fn save(&self, candidates: &[PortfolioCandidate]) -> Result<(), CheckpointError>;

    /// Load the last snapshot, `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Vec<PortfolioCandidate>>, CheckpointError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    schema_version: u32,
    saved_at: NaiveDateTime,
    candidates: Vec<PortfolioCandidate>,
}

/// JSON checkpoint on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointer {
    path: PathBuf,
}

impl JsonFileCheckpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Checkpointer for JsonFileCheckpointer {
    fn save(&self, candidates: &[PortfolioCandidate]) -> Result<(), CheckpointError> {
        let file = CheckpointFile {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            saved_at: Utc::now().naive_utc(),
            candidates: candidates.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Atomic replace.
        let tmp = self.temp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<PortfolioCandidate>>, CheckpointError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CheckpointFile = serde_json::from_str(&json)?;
        if file.schema_version > CHECKPOINT_SCHEMA_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: file.schema_version,
                supported: CHECKPOINT_SCHEMA_VERSION,
            });
        }
        Ok(Some(file.candidates))
    }
}

/// In-process checkpoint store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    slot: Mutex<Option<Vec<PortfolioCandidate>>>,
    saves: AtomicUsize,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, as if a previous run had saved `candidates`.
    pub fn with_snapshot(candidates: Vec<PortfolioCandidate>) -> Self {
        Self {
            slot: Mutex::new(Some(candidates)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Option<Vec<PortfolioCandidate>> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Checkpointer for MemoryCheckpointer {
    fn save(&self, candidates: &[PortfolioCandidate]) -> Result<(), CheckpointError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "checkpoint slot poisoned"))?;
        *slot = Some(candidates.to_vec());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<PortfolioCandidate>>, CheckpointError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "checkpoint slot poisoned"))?;
        Ok(slot.clone())
    }
}
