//! Glossa annotation engine: generated descriptions for declarative
//! analytics catalogs.
//!
//! A workspace catalog is a tree of YAML documents (date instances,
//! datasets with nested attributes/labels/facts, metrics, visualization
//! objects, dashboards). This crate walks that tree in dependency order and
//! asks a text-generation service for a short business description of every
//! object that does not have one cached yet.
//!
//! The interesting part is ordering: a visualization's prompt wants the
//! descriptions of the metrics it plots, a dashboard's prompt wants the
//! descriptions of its insights, and a derived metric's expression may name
//! other metrics. Instead of a general graph solver, the engine runs six
//! fixed phases:
//!
//! 1. date instances
//! 2. datasets (cascading into attributes, labels, facts)
//! 3. metrics whose expression references no other metric
//! 4. metrics whose expression references at least one metric
//! 5. visualization objects
//! 6. dashboards
//!
//! A single `descriptions.yaml` mapping (entity id → description) is loaded
//! at the start of a run, consulted before every generation call, extended
//! after every successful one, and persisted in full at the end. Once a key
//! is present its value is never regenerated, which makes reruns idempotent
//! and keeps dependency context stable.

pub mod cache;
pub mod catalog;
pub mod docstore;
pub mod document;
pub mod engine;
pub mod extract;
pub mod llm;
pub mod prompt;

use std::path::PathBuf;

pub use cache::{CacheError, DescriptionCache};
pub use catalog::{CatalogStore, HttpCatalogStore, LocalCatalogStore};
pub use engine::{AnnotationEngine, EngineConfig, RunReport};
pub use llm::{DescriptionSource, LlmError, LookupSource, OpenAiSource, StaticSource};

// ============================================================================
// Core Types
// ============================================================================

/// Category of a catalog object. Entity ids are qualified with the category
/// (`dataset/customers`, `metric/revenue`), and the category decides which
/// prompt shape and length budget an object gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Dataset,
    Attribute,
    Label,
    Fact,
    DateInstance,
    Metric,
    VisualizationObject,
    Dashboard,
}

impl ObjectKind {
    /// Human-readable category name, used in prompts and log lines.
    pub fn label(self) -> &'static str {
        match self {
            ObjectKind::Dataset => "dataset",
            ObjectKind::Attribute => "attribute",
            ObjectKind::Label => "label",
            ObjectKind::Fact => "fact",
            ObjectKind::DateInstance => "date instance",
            ObjectKind::Metric => "metric",
            ObjectKind::VisualizationObject => "visualization object",
            ObjectKind::Dashboard => "analytical dashboard",
        }
    }

    /// Advisory character budget stated in the prompt. Leaf objects get a
    /// short budget; composite objects (metrics, visualizations,
    /// dashboards) get a longer one. The engine never enforces this.
    pub fn budget_chars(self) -> usize {
        match self {
            ObjectKind::Metric | ObjectKind::VisualizationObject | ObjectKind::Dashboard => 256,
            _ => 128,
        }
    }
}

// ============================================================================
// Error Taxonomy
// ============================================================================

/// Run-fatal errors. Soft per-document failures (unreadable file, rejected
/// generation) are logged and counted, never surfaced here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The remote catalog layout could not be materialized. Aborts the run
    /// before any annotation work starts.
    #[error("catalog layout materialization failed: {0}")]
    Catalog(String),

    /// A document (or nested element) subject to annotation has no id.
    /// Every cache operation keys on the id, so this is fatal rather than a
    /// skip.
    #[error("{kind} in {path} has no id")]
    MissingId { kind: &'static str, path: PathBuf },

    /// The generation service failed. Descriptions are cumulative and a
    /// half-annotated batch cannot be resumed mid-flight, so the whole run
    /// stops; everything committed to the cache before the failing call is
    /// still valid on the next run.
    #[error("generation service failure: {0}")]
    Service(#[from] LlmError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A document or the descriptions file could not be written back.
    #[error("failed to persist {path}: {message}")]
    Persistence { path: PathBuf, message: String },
}
