//! The description cache: the single source of truth mapping entity id →
//! description text for a run.
//!
//! Loaded once at run start from `descriptions.yaml` (absent or unreadable
//! file starts the run with an empty mapping), extended as entities are
//! annotated, and written back in full at run end. The engine treats an
//! entry as immutable once set: it always checks `contains` before
//! generating, so an id is described at most once across all runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Every cached entity must carry a non-empty id; an entity without one
    /// is a fatal input error, not a skip.
    #[error("description cache keys must be non-empty entity ids")]
    InvalidKey,

    #[error("failed to write descriptions file {path}: {message}")]
    Persist { path: PathBuf, message: String },
}

/// Append-only id → description mapping. `BTreeMap` keeps the persisted
/// file stably ordered across runs.
#[derive(Debug, Default)]
pub struct DescriptionCache {
    entries: BTreeMap<String, String>,
}

impl DescriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted mapping. An absent file is an empty cache; a
    /// corrupt file is logged and also treated as empty, so a damaged
    /// descriptions file costs regeneration work rather than the run.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no descriptions file, starting with empty cache");
            return Self::new();
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read descriptions file, starting empty");
                return Self::new();
            }
        };
        if text.trim().is_empty() {
            return Self::new();
        }
        match serde_yaml::from_str::<BTreeMap<String, String>>(&text) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "loaded descriptions file");
                Self { entries }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "descriptions file is not a flat id -> text mapping, starting empty");
                Self::new()
            }
        }
    }

    /// Write the full mapping. Failure here is fatal to the run.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let text = serde_yaml::to_string(&self.entries).map_err(|e| CacheError::Persist {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| CacheError::Persist {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), entries = self.entries.len(), "descriptions file written");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Record a description. The engine checks `contains` first, so an
    /// overwrite indicates a caller bypassing that check; it is honored but
    /// logged.
    pub fn insert(&mut self, id: &str, description: String) -> Result<(), CacheError> {
        if id.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        if let Some(previous) = self.entries.insert(id.to_string(), description) {
            warn!(%id, %previous, "description cache entry overwritten");
        }
        Ok(())
    }

    /// The full mapping, for persistence and reporting.
    pub fn snapshot(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_id_is_rejected() {
        let mut cache = DescriptionCache::new();
        assert!(matches!(cache.insert("", "x".into()), Err(CacheError::InvalidKey)));
        assert!(cache.is_empty());
    }

    #[test]
    fn absent_file_loads_empty() {
        let dir = tempdir().unwrap();
        let cache = DescriptionCache::load(&dir.path().join("descriptions.yaml"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("descriptions.yaml");
        std::fs::write(&path, "- not\n- a\n- mapping\n").unwrap();
        let cache = DescriptionCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("descriptions.yaml");

        let mut cache = DescriptionCache::new();
        cache.insert("dataset/customers", "All customer accounts.".into()).unwrap();
        cache.insert("metric/revenue", "Total booked revenue.".into()).unwrap();
        cache.save(&path).unwrap();

        let reloaded = DescriptionCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("metric/revenue"), Some("Total booked revenue."));
        assert!(reloaded.contains("dataset/customers"));
    }
}
