//! Catalog store: materializing the remote workspace layout into the
//! document tree the annotation phases read.
//!
//! The layout directory convention mirrors the declarative workspace API:
//! one YAML document per entity, grouped by category. Materialization runs
//! before phase 1 and any failure aborts the run before annotation work
//! starts.

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::EngineError;

pub const DATE_INSTANCE_DIR: &str = "ldm/date_instances";
pub const DATASET_DIR: &str = "ldm/datasets";
pub const METRIC_DIR: &str = "analytics_model/metrics";
pub const VISUALIZATION_DIR: &str = "analytics_model/visualization_objects";
pub const DASHBOARD_DIR: &str = "analytics_model/analytical_dashboards";

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Materialize the workspace layout as documents under `dest`.
    async fn store_layout(&self, workspace_id: &str, dest: &Path) -> Result<(), EngineError>;
}

/// Serves a tree that is already on disk. No-op.
pub struct LocalCatalogStore;

#[async_trait]
impl CatalogStore for LocalCatalogStore {
    async fn store_layout(&self, workspace_id: &str, dest: &Path) -> Result<(), EngineError> {
        if !dest.is_dir() {
            return Err(EngineError::Catalog(format!(
                "layout directory {} does not exist (offline mode expects a materialized tree)",
                dest.display()
            )));
        }
        debug!(%workspace_id, dest = %dest.display(), "using layout already on disk");
        Ok(())
    }
}

/// Fetches the declarative workspace layout over HTTP and splits it into
/// one document per entity.
pub struct HttpCatalogStore {
    client: Client,
    hostname: String,
    api_token: String,
}

impl HttpCatalogStore {
    pub fn new(hostname: &str, api_token: &str) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| EngineError::Catalog(e.to_string()))?;
        Ok(Self {
            client,
            hostname: hostname.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    async fn fetch_layout(&self, workspace_id: &str) -> Result<serde_json::Value, EngineError> {
        let url = format!(
            "{}/api/v1/layout/workspaces/{workspace_id}",
            self.hostname
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await
            .map_err(|e| EngineError::Catalog(format!("layout request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Catalog(format!(
                "layout request returned status {status}: {text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::Catalog(format!("layout response is not JSON: {e}")))
    }
}

#[async_trait]
impl CatalogStore for HttpCatalogStore {
    async fn store_layout(&self, workspace_id: &str, dest: &Path) -> Result<(), EngineError> {
        let layout = self.fetch_layout(workspace_id).await?;

        write_group(&layout["ldm"]["dateInstances"], dest, DATE_INSTANCE_DIR)?;
        write_group(&layout["ldm"]["datasets"], dest, DATASET_DIR)?;
        write_group(&layout["analytics"]["metrics"], dest, METRIC_DIR)?;
        write_group(
            &layout["analytics"]["visualizationObjects"],
            dest,
            VISUALIZATION_DIR,
        )?;
        write_group(
            &layout["analytics"]["analyticalDashboards"],
            dest,
            DASHBOARD_DIR,
        )?;

        info!(%workspace_id, dest = %dest.display(), "workspace layout stored");
        Ok(())
    }
}

/// Write one category's objects as `<dest>/<category_dir>/<id>.yaml`. A
/// category absent from the layout writes nothing.
fn write_group(objects: &serde_json::Value, dest: &Path, category_dir: &str) -> Result<(), EngineError> {
    let Some(items) = objects.as_array() else {
        return Ok(());
    };

    let dir = dest.join(category_dir);
    fs::create_dir_all(&dir).map_err(|e| {
        EngineError::Catalog(format!("failed to create {}: {e}", dir.display()))
    })?;

    for object in items {
        let id = object["id"].as_str().ok_or_else(|| {
            EngineError::Catalog(format!("remote layout object without id under {category_dir}"))
        })?;
        let text = serde_yaml::to_string(object)
            .map_err(|e| EngineError::Catalog(format!("failed to encode {category_dir}/{id}: {e}")))?;
        let path = dir.join(format!("{id}.yaml"));
        fs::write(&path, text).map_err(|e| {
            EngineError::Catalog(format!("failed to write {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "layout document written");
    }

    Ok(())
}
