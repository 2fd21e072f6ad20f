use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use plexwatch_models::TrackedEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Whole-snapshot persistence of the tracked entries
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Vec<TrackedEntry>>;

    /// Replace the stored snapshot. Either the new snapshot is stored in
    /// full or the old one is left untouched.
    fn save(&self, entries: &[TrackedEntry]) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    updated_at: DateTime<Utc>,
    entries: Vec<TrackedEntry>,
}

/// JSON snapshot on disk, written through a temp file and a rename
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// Remove the snapshot. Returns whether there was one.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove state file {:?}", self.path))?;
        info!("Cleared tracked state at {:?}", self.path);
        Ok(true)
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Vec<TrackedEntry>> {
        if !self.path.exists() {
            debug!("No state file at {:?}, starting empty", self.path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file {:?}", self.path))?;

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => {
                debug!("Loaded {} tracked entries (saved {})", snapshot.entries.len(), snapshot.updated_at);
                Ok(snapshot.entries)
            }
            Err(e) => {
                let backup_path = self.backup_path();
                match std::fs::rename(&self.path, &backup_path) {
                    Ok(()) => warn!(
                        "State file is corrupt ({}). Moved it to {:?} and starting with empty state.",
                        e, backup_path
                    ),
                    Err(rename_err) => warn!(
                        "State file is corrupt ({}) and could not be moved aside: {}. Starting with empty state.",
                        e, rename_err
                    ),
                }
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, entries: &[TrackedEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory {:?}", parent))?;
        }

        let snapshot = Snapshot {
            updated_at: Utc::now(),
            entries: entries.to_vec(),
        };
        let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize state")?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write {:?}", temp_path))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace state file {:?}", self.path))?;

        debug!("Saved {} tracked entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}
