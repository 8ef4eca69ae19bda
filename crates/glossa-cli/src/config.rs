//! Configuration loading and validation.
//!
//! Settings come from a `config.yaml`; the two tokens can also be supplied
//! via `GLOSSA_API_TOKEN` / `GLOSSA_LLM_API_TOKEN`, which take precedence
//! over the file. Every required key that is missing is reported in one
//! startup error rather than one at a time.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const API_TOKEN_ENV: &str = "GLOSSA_API_TOKEN";
pub const LLM_API_TOKEN_ENV: &str = "GLOSSA_LLM_API_TOKEN";

const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    hostname: Option<String>,
    api_token: Option<String>,
    llm_api_token: Option<String>,
    workspace_id: Option<String>,
    layout_root_directory: Option<String>,
    llm_model: Option<String>,
    batch_size: Option<usize>,
}

/// Fully validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub hostname: String,
    pub api_token: String,
    pub llm_api_token: String,
    pub workspace_id: String,
    pub layout_root_directory: PathBuf,
    pub llm_model: String,
    pub batch_size: Option<usize>,
    /// Directory the config file lives in; `descriptions.yaml` is kept
    /// next to it.
    pub root_path: PathBuf,
}

impl Settings {
    pub fn layout_root(&self) -> PathBuf {
        self.root_path.join(&self.layout_root_directory)
    }
}

pub fn load(config_path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read configuration file {}", config_path.display()))?;
    let raw: RawConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse configuration file {}", config_path.display()))?;

    let api_token = env::var(API_TOKEN_ENV).ok().or(raw.api_token);
    let llm_api_token = env::var(LLM_API_TOKEN_ENV).ok().or(raw.llm_api_token);

    let mut missing = Vec::new();
    if raw.hostname.is_none() {
        missing.push("hostname");
    }
    if api_token.is_none() {
        missing.push("api_token");
    }
    if llm_api_token.is_none() {
        missing.push("llm_api_token");
    }
    if raw.workspace_id.is_none() {
        missing.push("workspace_id");
    }
    if raw.layout_root_directory.is_none() {
        missing.push("layout_root_directory");
    }
    if !missing.is_empty() {
        bail!("missing configuration keys: {}", missing.join(", "));
    }

    let root_path = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    Ok(Settings {
        hostname: raw.hostname.unwrap_or_default(),
        api_token: api_token.unwrap_or_default(),
        llm_api_token: llm_api_token.unwrap_or_default(),
        workspace_id: raw.workspace_id.unwrap_or_default(),
        layout_root_directory: PathBuf::from(raw.layout_root_directory.unwrap_or_default()),
        llm_model: raw.llm_model.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        batch_size: raw.batch_size,
        root_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("config.yaml");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn valid_config_loads() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "hostname: https://example.cloud\n\
             api_token: t1\n\
             llm_api_token: t2\n\
             workspace_id: demo\n\
             layout_root_directory: workspace_layout\n",
        );
        let settings = load(&path).unwrap();
        assert_eq!(settings.workspace_id, "demo");
        assert_eq!(settings.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(settings.layout_root(), dir.path().join("workspace_layout"));
    }

    #[test]
    fn missing_keys_are_listed_together() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "hostname: https://example.cloud\n");
        let err = load(&path).unwrap_err().to_string();
        assert!(err.contains("workspace_id"));
        assert!(err.contains("layout_root_directory"));
        assert!(!err.contains("hostname,"));
    }
}
