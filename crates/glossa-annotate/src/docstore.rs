//! Reading and writing the per-entity YAML documents.
//!
//! A document that cannot be read or parsed is logged and skipped (the run
//! continues without it); a document that cannot be written back is fatal.
//! Enumeration order within a category directory is sorted so a given
//! layout snapshot always processes in the same order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::EngineError;

/// All YAML documents under `root` whose parent directory ends with the
/// given category path (e.g. `ldm/datasets`), sorted.
pub fn list_documents(root: &Path, category_dir: &str) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let is_yaml = path
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            is_yaml
                && path
                    .parent()
                    .map(|dir| dir.ends_with(category_dir))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}

/// Read and parse one document. `None` means "skip this entity": the
/// failure is logged here and the caller moves on.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document, skipping");
            return None;
        }
    };
    match serde_yaml::from_str(&text) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse document, skipping");
            None
        }
    }
}

/// Rewrite one document. Failure is fatal upstream.
pub fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<(), EngineError> {
    let text = serde_yaml::to_string(doc).map_err(|e| EngineError::Persistence {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, text).map_err(|e| EngineError::Persistence {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), "document rewritten");
    Ok(())
}
