//! Phase scheduler and per-entity annotation flow.
//!
//! Phases run strictly in order, one entity at a time, so every reference
//! an entity's prompt wants has already been through an earlier phase (or
//! an earlier run). Per entity the flow is:
//!
//! - id already cached → copy the cached description onto the document and
//!   stop (the terminal path for reruns);
//! - otherwise extract references, build the prompt, call the generation
//!   service, and commit the result to both the document and the cache;
//! - metrics only: a generated text that reads like a table summary is
//!   rejected — logged, counted, and the entity is left without a
//!   description for this run.
//!
//! The metric split is deliberately single-hop: all metrics without metric
//! references are annotated before any metric with them, which satisfies
//! one level of derivation without graph traversal. A dependent metric
//! whose expression names a still-undescribed metric (a deeper chain) is
//! flagged in the log and processed anyway.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::DescriptionCache;
use crate::catalog::{self, CatalogStore};
use crate::docstore;
use crate::document::{DashboardDoc, DateInstanceDoc, DatasetDoc, MetricDoc, VisualizationDoc};
use crate::extract;
use crate::llm::{DescriptionSource, DEFAULT_MAX_OUTPUT_TOKENS};
use crate::prompt::{self, LeafDetail};
use crate::{EngineError, ObjectKind};

pub const DEFAULT_BATCH_SIZE: usize = 50;

// ============================================================================
// Configuration and Report
// ============================================================================

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workspace_id: String,
    /// Directory holding `descriptions.yaml`.
    pub root_path: PathBuf,
    /// Files per logged batch within a phase. Purely log structure; within
    /// a batch processing stays sequential.
    pub batch_size: usize,
}

impl EngineConfig {
    pub fn new(workspace_id: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            root_path: root_path.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn descriptions_path(&self) -> PathBuf {
        self.root_path.join("descriptions.yaml")
    }
}

/// Counters for one run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    /// Descriptions newly generated and committed.
    pub generated: usize,
    /// Entities served from the cache.
    pub reused: usize,
    /// Generated texts rejected by the metric sanity check.
    pub rejected: usize,
    /// Documents that could not be read or parsed.
    pub skipped_documents: usize,
}

// ============================================================================
// Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    DateInstances,
    Datasets,
    NonDependentMetrics,
    DependentMetrics,
    Visualizations,
    Dashboards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricTier {
    NonDependent,
    Dependent,
}

impl Phase {
    const ORDER: [Phase; 6] = [
        Phase::DateInstances,
        Phase::Datasets,
        Phase::NonDependentMetrics,
        Phase::DependentMetrics,
        Phase::Visualizations,
        Phase::Dashboards,
    ];

    fn name(self) -> &'static str {
        match self {
            Phase::DateInstances => "date instances",
            Phase::Datasets => "datasets",
            Phase::NonDependentMetrics => "non-dependent metrics",
            Phase::DependentMetrics => "dependent metrics",
            Phase::Visualizations => "visualization objects",
            Phase::Dashboards => "dashboards",
        }
    }

    fn category_dir(self) -> &'static str {
        match self {
            Phase::DateInstances => catalog::DATE_INSTANCE_DIR,
            Phase::Datasets => catalog::DATASET_DIR,
            Phase::NonDependentMetrics | Phase::DependentMetrics => catalog::METRIC_DIR,
            Phase::Visualizations => catalog::VISUALIZATION_DIR,
            Phase::Dashboards => catalog::DASHBOARD_DIR,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct AnnotationEngine {
    config: EngineConfig,
    catalog: Box<dyn CatalogStore>,
    source: Arc<dyn DescriptionSource>,
    cache: DescriptionCache,
    report: RunReport,
}

impl AnnotationEngine {
    /// Build an engine. The description cache is loaded here, once; the
    /// generation source and catalog store are fixed for the engine's
    /// lifetime.
    pub fn new(
        config: EngineConfig,
        catalog: Box<dyn CatalogStore>,
        source: Arc<dyn DescriptionSource>,
    ) -> Self {
        let cache = DescriptionCache::load(&config.descriptions_path());
        Self {
            config,
            catalog,
            source,
            cache,
            report: RunReport::default(),
        }
    }

    pub fn cache(&self) -> &DescriptionCache {
        &self.cache
    }

    /// Full run: materialize the layout, run all six phases, persist the
    /// cache snapshot once.
    pub async fn run(&mut self, layout_root: &Path) -> Result<RunReport, EngineError> {
        self.catalog
            .store_layout(&self.config.workspace_id, layout_root)
            .await?;

        for phase in Phase::ORDER {
            self.run_phase(phase, layout_root).await?;
        }

        self.cache.save(&self.config.descriptions_path())?;
        for (id, description) in self.cache.snapshot() {
            debug!(%id, %description, "final cache entry");
        }

        Ok(self.report.clone())
    }

    async fn run_phase(&mut self, phase: Phase, layout_root: &Path) -> Result<(), EngineError> {
        let paths = docstore::list_documents(layout_root, phase.category_dir());
        info!(phase = phase.name(), files = paths.len(), "starting phase");

        let batch_size = self.config.batch_size.max(1);
        for (index, batch) in paths.chunks(batch_size).enumerate() {
            debug!(
                phase = phase.name(),
                batch = index + 1,
                files = batch.len(),
                "processing batch"
            );
            for path in batch {
                match phase {
                    Phase::DateInstances => self.annotate_date_instance(path).await?,
                    Phase::Datasets => self.annotate_dataset(path).await?,
                    Phase::NonDependentMetrics => {
                        self.annotate_metric(path, MetricTier::NonDependent).await?
                    }
                    Phase::DependentMetrics => {
                        self.annotate_metric(path, MetricTier::Dependent).await?
                    }
                    Phase::Visualizations => self.annotate_visualization(path).await?,
                    Phase::Dashboards => self.annotate_dashboard(path).await?,
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Per-Category Annotation
    // ========================================================================

    async fn annotate_date_instance(&mut self, path: &Path) -> Result<(), EngineError> {
        let Some(mut doc) = docstore::read_document::<DateInstanceDoc>(path) else {
            self.report.skipped_documents += 1;
            return Ok(());
        };
        let before = doc.clone();

        let id = require_id(doc.id.as_deref(), ObjectKind::DateInstance, path)?;
        if let Some(existing) = self.apply_cached(&id, ObjectKind::DateInstance) {
            doc.description = Some(existing);
        } else {
            let formatting = doc
                .granularities_formatting
                .as_ref()
                .and_then(|v| serde_yaml::to_string(v).ok());
            let prompt = prompt::date_instance(
                doc.title.as_deref().unwrap_or(""),
                &id,
                &doc.granularities,
                formatting.as_deref().map(str::trim),
            );
            doc.description = Some(
                self.generate_and_commit(ObjectKind::DateInstance, &id, &prompt)
                    .await?,
            );
        }

        self.write_if_changed(path, &before, &doc)
    }

    async fn annotate_dataset(&mut self, path: &Path) -> Result<(), EngineError> {
        let Some(mut doc) = docstore::read_document::<DatasetDoc>(path) else {
            self.report.skipped_documents += 1;
            return Ok(());
        };
        let before = doc.clone();

        let id = require_id(doc.id.as_deref(), ObjectKind::Dataset, path)?;
        if let Some(existing) = self.apply_cached(&id, ObjectKind::Dataset) {
            doc.description = Some(existing);
        } else {
            let prompt = prompt::leaf(
                ObjectKind::Dataset,
                doc.title.as_deref().unwrap_or(""),
                &id,
                &LeafDetail {
                    tags: &doc.tags,
                    ..Default::default()
                },
            );
            doc.description = Some(
                self.generate_and_commit(ObjectKind::Dataset, &id, &prompt)
                    .await?,
            );
        }

        // Cascade into nested attributes (with their labels) and facts, in
        // document order.
        for attribute in &mut doc.attributes {
            let attr_id = require_id(attribute.id.as_deref(), ObjectKind::Attribute, path)?;
            if let Some(existing) = self.apply_cached(&attr_id, ObjectKind::Attribute) {
                attribute.description = Some(existing);
            } else {
                let prompt = prompt::leaf(
                    ObjectKind::Attribute,
                    attribute.title.as_deref().unwrap_or(""),
                    &attr_id,
                    &LeafDetail {
                        source_column: attribute.source_column.as_deref(),
                        source_column_type: attribute.source_column_data_type.as_deref(),
                        tags: &attribute.tags,
                        ..Default::default()
                    },
                );
                attribute.description = Some(
                    self.generate_and_commit(ObjectKind::Attribute, &attr_id, &prompt)
                        .await?,
                );
            }

            for label in &mut attribute.labels {
                let label_id = require_id(label.id.as_deref(), ObjectKind::Label, path)?;
                if let Some(existing) = self.apply_cached(&label_id, ObjectKind::Label) {
                    label.description = Some(existing);
                } else {
                    let prompt = prompt::leaf(
                        ObjectKind::Label,
                        label.title.as_deref().unwrap_or(""),
                        &label_id,
                        &LeafDetail {
                            source_column: label.source_column.as_deref(),
                            source_column_type: label.source_column_data_type.as_deref(),
                            value_type: label.value_type.as_deref(),
                            tags: &label.tags,
                        },
                    );
                    label.description = Some(
                        self.generate_and_commit(ObjectKind::Label, &label_id, &prompt)
                            .await?,
                    );
                }
            }
        }

        for fact in &mut doc.facts {
            let fact_id = require_id(fact.id.as_deref(), ObjectKind::Fact, path)?;
            if let Some(existing) = self.apply_cached(&fact_id, ObjectKind::Fact) {
                fact.description = Some(existing);
            } else {
                let prompt = prompt::leaf(
                    ObjectKind::Fact,
                    fact.title.as_deref().unwrap_or(""),
                    &fact_id,
                    &LeafDetail {
                        source_column: fact.source_column.as_deref(),
                        source_column_type: fact.source_column_data_type.as_deref(),
                        tags: &fact.tags,
                        ..Default::default()
                    },
                );
                fact.description = Some(
                    self.generate_and_commit(ObjectKind::Fact, &fact_id, &prompt)
                        .await?,
                );
            }
        }

        self.write_if_changed(path, &before, &doc)
    }

    /// Metric documents are enumerated in both metric phases; the tier test
    /// decides which phase actually generates. A cached metric is applied
    /// in whichever phase sees it first.
    async fn annotate_metric(&mut self, path: &Path, tier: MetricTier) -> Result<(), EngineError> {
        let Some(mut doc) = docstore::read_document::<MetricDoc>(path) else {
            self.report.skipped_documents += 1;
            return Ok(());
        };
        let before = doc.clone();

        let id = require_id(doc.id.as_deref(), ObjectKind::Metric, path)?;
        if let Some(existing) = self.apply_cached(&id, ObjectKind::Metric) {
            doc.description = Some(existing);
        } else {
            let dependent = extract::has_metric_reference(&doc.content.maql);
            let this_phase = dependent == (tier == MetricTier::Dependent);
            if this_phase {
                if tier == MetricTier::Dependent {
                    self.flag_unresolved_metric_references(&id, &doc.content.maql);
                }

                let prompt = prompt::metric(
                    doc.title.as_deref().unwrap_or(""),
                    &id,
                    &doc.content.maql,
                    doc.content.format.as_deref(),
                );
                let text = self.source.generate(&prompt, DEFAULT_MAX_OUTPUT_TOKENS).await?;

                // Sanity check: the service sometimes describes the
                // underlying table instead of the computed value. Such a
                // text is withheld; the entity keeps whatever description
                // it had and is retried on the next run.
                if text.to_ascii_lowercase().contains("dataset") {
                    warn!(%id, %text, "rejected metric description that reads like a dataset summary");
                    self.report.rejected += 1;
                } else {
                    doc.description = Some(text.clone());
                    self.cache.insert(&id, text)?;
                    self.report.generated += 1;
                    info!(%id, kind = ObjectKind::Metric.label(), "generated description");
                }
            }
        }

        self.write_if_changed(path, &before, &doc)
    }

    async fn annotate_visualization(&mut self, path: &Path) -> Result<(), EngineError> {
        let Some(mut doc) = docstore::read_document::<VisualizationDoc>(path) else {
            self.report.skipped_documents += 1;
            return Ok(());
        };
        let before = doc.clone();

        let id = require_id(doc.id.as_deref(), ObjectKind::VisualizationObject, path)?;
        if let Some(existing) = self.apply_cached(&id, ObjectKind::VisualizationObject) {
            doc.description = Some(existing);
        } else {
            let references = extract::extract_visualization_references(&doc.content);
            let prompt = prompt::visualization(
                doc.title.as_deref().unwrap_or(""),
                &id,
                doc.visualization_url.as_deref(),
                &self.cache,
                &references,
            );
            doc.description = Some(
                self.generate_and_commit(ObjectKind::VisualizationObject, &id, &prompt)
                    .await?,
            );
        }

        self.write_if_changed(path, &before, &doc)
    }

    async fn annotate_dashboard(&mut self, path: &Path) -> Result<(), EngineError> {
        let Some(mut doc) = docstore::read_document::<DashboardDoc>(path) else {
            self.report.skipped_documents += 1;
            return Ok(());
        };
        let before = doc.clone();

        let id = require_id(doc.id.as_deref(), ObjectKind::Dashboard, path)?;
        if let Some(existing) = self.apply_cached(&id, ObjectKind::Dashboard) {
            doc.description = Some(existing);
        } else {
            let references = extract::extract_dashboard_references(&doc.layout);
            let prompt = prompt::dashboard(
                doc.title.as_deref().unwrap_or(""),
                &id,
                &self.cache,
                &references,
            );
            doc.description = Some(
                self.generate_and_commit(ObjectKind::Dashboard, &id, &prompt)
                    .await?,
            );
        }

        self.write_if_changed(path, &before, &doc)
    }

    // ========================================================================
    // Shared Transitions
    // ========================================================================

    /// Terminal success path for reruns: the cached description, if any.
    fn apply_cached(&mut self, id: &str, kind: ObjectKind) -> Option<String> {
        let existing = self.cache.get(id)?.to_string();
        self.report.reused += 1;
        debug!(%id, kind = kind.label(), "description already cached");
        Some(existing)
    }

    /// Generate a description and commit it to the cache. Only called after
    /// `apply_cached` came up empty, preserving at-most-once generation per
    /// id.
    async fn generate_and_commit(
        &mut self,
        kind: ObjectKind,
        id: &str,
        prompt: &str,
    ) -> Result<String, EngineError> {
        debug!(%id, "requesting description");
        let text = self.source.generate(prompt, DEFAULT_MAX_OUTPUT_TOKENS).await?;
        self.cache.insert(id, text.clone())?;
        self.report.generated += 1;
        info!(%id, kind = kind.label(), "generated description");
        Ok(text)
    }

    /// The two-tier metric split only resolves one level of derivation.
    /// Deeper chains are flagged, never reordered.
    fn flag_unresolved_metric_references(&self, id: &str, expression: &str) {
        for reference in extract::extract_expression_references(expression) {
            if reference.starts_with("metric/") && !self.cache.contains(&reference) {
                warn!(
                    metric = %id,
                    %reference,
                    "referenced metric has no description yet; dependency chain deeper than one level"
                );
            }
        }
    }

    fn write_if_changed<T: Serialize + PartialEq>(
        &self,
        path: &Path,
        before: &T,
        after: &T,
    ) -> Result<(), EngineError> {
        if before == after {
            debug!(path = %path.display(), "document unchanged");
            return Ok(());
        }
        docstore::write_document(path, after)
    }
}

fn require_id(id: Option<&str>, kind: ObjectKind, path: &Path) -> Result<String, EngineError> {
    match id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(EngineError::MissingId {
            kind: kind.label(),
            path: path.to_path_buf(),
        }),
    }
}
