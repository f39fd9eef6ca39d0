//! File-backed record of the events that were already announced.
//!
//! The file holds one identifier per line. It is rewritten in full on every
//! save through a temporary sibling file that is renamed over the target, so a
//! crash mid-write leaves the previous record intact.

use crate::error::{store_error, NotifierResult};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Persisted set of notified event identifiers
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, falling back to an empty set on any failure
    pub async fn load(&self) -> HashSet<String> {
        match self.try_load().await {
            Ok(ids) => {
                debug!("Loaded {} notified events from {}", ids.len(), self.path.display());
                ids
            }
            Err(e) => {
                warn!("{}; starting with an empty record", e);
                HashSet::new()
            }
        }
    }

    /// Load the record. A missing file is an empty record, not an error.
    pub async fn try_load(&self) -> NotifierResult<HashSet<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse_record(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(store_error(&format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Replace the record with `ids`
    pub async fn save(&self, ids: &HashSet<String>) -> NotifierResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                store_error(&format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        let mut content = String::with_capacity(sorted.iter().map(|id| id.len() + 1).sum());
        for id in sorted {
            content.push_str(id);
            content.push('\n');
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, content).await.map_err(|e| {
            store_error(&format!("Failed to write {}: {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            store_error(&format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Saved {} notified events to {}", ids.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("notified_events"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn parse_record(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
