//! Prompt assembly for the generation service.
//!
//! One prompt shape per category. Composite objects (visualizations,
//! dashboards) get a context block with one line per referenced id,
//! resolved read-only from the description cache in extraction order.
//! The character budget stated in every prompt is advisory to the service;
//! nothing here or downstream truncates a long response.

use std::fmt::Write;

use crate::cache::DescriptionCache;
use crate::ObjectKind;

/// Context line filler for references that have no description yet.
pub const NO_DESCRIPTION: &str = "No description available";

/// Prompt fields shared by the leaf categories (dataset, attribute, label,
/// fact). Absent fields are simply left out of the prompt.
#[derive(Debug, Default)]
pub struct LeafDetail<'a> {
    pub source_column: Option<&'a str>,
    pub source_column_type: Option<&'a str>,
    pub value_type: Option<&'a str>,
    pub tags: &'a [String],
}

fn push_request(prompt: &mut String, kind: ObjectKind) {
    let article = match kind {
        ObjectKind::Attribute | ObjectKind::Dashboard => "an",
        _ => "a",
    };
    let _ = write!(
        prompt,
        "Generate a descriptive text with business meaning for {article} {}. \
         Do not describe the raw field names themselves. \
         Do not wrap the answer in single or double quotes. \
         The description must fit into {} characters, based on the following details:\n",
        kind.label(),
        kind.budget_chars(),
    );
}

/// Prompt for a dataset, attribute, label or fact.
pub fn leaf(kind: ObjectKind, title: &str, id: &str, detail: &LeafDetail<'_>) -> String {
    let mut prompt = String::new();
    push_request(&mut prompt, kind);
    let _ = writeln!(prompt, "Title: {title}");
    let _ = writeln!(prompt, "ID: {id}");
    if let Some(column) = detail.source_column {
        let _ = writeln!(prompt, "Source column: {column}");
    }
    if let Some(column_type) = detail.source_column_type {
        let _ = writeln!(prompt, "Source column type: {column_type}");
    }
    if let Some(value_type) = detail.value_type {
        let _ = writeln!(prompt, "Value type: {value_type}");
    }
    if !detail.tags.is_empty() {
        let _ = writeln!(prompt, "Tags: {}", detail.tags.join(", "));
    }
    prompt
}

/// Prompt for a date instance.
pub fn date_instance(
    title: &str,
    id: &str,
    granularities: &[String],
    formatting: Option<&str>,
) -> String {
    let mut prompt = String::new();
    push_request(&mut prompt, ObjectKind::DateInstance);
    let _ = writeln!(prompt, "Title: {title}");
    let _ = writeln!(prompt, "ID: {id}");
    if !granularities.is_empty() {
        let _ = writeln!(prompt, "Granularities: {}", granularities.join(", "));
    }
    if let Some(formatting) = formatting {
        let _ = writeln!(prompt, "Granularity formatting: {formatting}");
    }
    prompt
}

/// Prompt for a metric. The raw expression is shown; referenced metrics are
/// never expanded into the prompt. The wording steers the service away from
/// describing the underlying table instead of the computed value (the
/// engine rejects responses that slip anyway).
pub fn metric(title: &str, id: &str, expression: &str, format: Option<&str>) -> String {
    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Generate a concise business-relevant description for a metric. \
         This is a computed metric, not a dataset: describe what it measures or \
         calculates based on the query expression below, not the tables it reads from. \
         It may be computed on top of a dataset, but it operates over it. \
         Do not wrap the answer in single or double quotes. \
         The description must fit into {} characters, based on the following details:\n",
        ObjectKind::Metric.budget_chars(),
    );
    let _ = writeln!(prompt, "Title: {title}");
    let _ = writeln!(prompt, "ID: {id}");
    let _ = writeln!(prompt, "MAQL: {expression}");
    if let Some(format) = format {
        let _ = writeln!(prompt, "Format: {format}");
    }
    prompt
}

/// Prompt for a visualization object, with one context line per referenced
/// id.
pub fn visualization(
    title: &str,
    id: &str,
    visualization_url: Option<&str>,
    cache: &DescriptionCache,
    reference_ids: &[String],
) -> String {
    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Generate a descriptive text for a visualization object with business meaning, \
         so it can be found by similarity search. \
         Do not describe the fields themselves. \
         Do not mention the visualization id. \
         Do not wrap the answer in single or double quotes. \
         The description must fit into {} characters, based on the following details:\n",
        ObjectKind::VisualizationObject.budget_chars(),
    );
    let _ = writeln!(prompt, "Title: {title}");
    let _ = writeln!(prompt, "ID: {id}");
    if let Some(url) = visualization_url {
        let _ = writeln!(prompt, "Visualization URL: {url}");
    }
    push_context(&mut prompt, cache, reference_ids);
    prompt
}

/// Prompt for a dashboard, with one context line per referenced id.
pub fn dashboard(
    title: &str,
    id: &str,
    cache: &DescriptionCache,
    reference_ids: &[String],
) -> String {
    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Generate a descriptive text for an analytical dashboard with business meaning, \
         so it can be found by similarity search. \
         Do not describe the fields themselves. \
         Do not wrap the answer in single or double quotes. \
         The description must fit into {} characters, based on the following details:\n",
        ObjectKind::Dashboard.budget_chars(),
    );
    let _ = writeln!(prompt, "Title: {title}");
    let _ = writeln!(prompt, "ID: {id}");
    push_context(&mut prompt, cache, reference_ids);
    prompt
}

fn push_context(prompt: &mut String, cache: &DescriptionCache, reference_ids: &[String]) {
    let _ = writeln!(prompt, "Context:");
    for id in reference_ids {
        let _ = writeln!(prompt, "{id}: {}", cache.get(id).unwrap_or(NO_DESCRIPTION));
    }
}
