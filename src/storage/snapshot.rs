//! Session snapshot persistence: one JSON file per submission token.
//!
//! Snapshots exist so an attempt survives a host restart within the same
//! session. They are not durable records; the host deletes them on
//! completion or explicit restart. The set/timestamp conversions live in
//! [`SessionSnapshot`](crate::engine::session::SessionSnapshot) itself.

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::engine::session::SessionSnapshot;

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, submission_token: &str) -> PathBuf {
        // Tokens are timestamp + alphanumeric suffix; keep only safe chars
        // in case a hand-edited snapshot is being resumed.
        let safe: String = submission_token
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf> {
        let path = self.path_for(&snapshot.submission_token);
        let content = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        debug!("Snapshot saved to {}", path.display());
        Ok(path)
    }

    pub fn load(&self, submission_token: &str) -> Result<SessionSnapshot> {
        let path = self.path_for(submission_token);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("No snapshot found at {}", path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Snapshot {} is corrupt: {}", path.display(), e))
    }

    pub fn delete(&self, submission_token: &str) -> Result<()> {
        let path = self.path_for(submission_token);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete snapshot {}", path.display()))?;
            debug!("Snapshot {} deleted", path.display());
        }
        Ok(())
    }

    /// All resumable snapshots, newest first. Unreadable files are skipped
    /// with a warning rather than failing the listing.
    pub fn list(&self) -> Result<Vec<SessionSnapshot>> {
        let mut snapshots = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(serde_json::from_str::<SessionSnapshot>(&content)?))
            {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Skipping unreadable snapshot {}: {}", path.display(), e),
            }
        }
        snapshots.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(snapshots)
    }
}
