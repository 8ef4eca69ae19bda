//! Reference extraction from the two embedded micro-languages.
//!
//! Two places in a catalog name other objects: metric query expressions
//! (free text containing qualified ids) and the structured content of
//! visualization objects and dashboards. The extractors here are pure:
//! same input, same ordered output, duplicates preserved, and a shape they
//! do not recognize simply contributes nothing. They never consult the
//! cache or the generation service.

use std::sync::OnceLock;

use regex::Regex;

use crate::document::{DashboardLayout, VisualizationContent};

static EXPRESSION_ID_RE: OnceLock<Regex> = OnceLock::new();

fn expression_id_re() -> &'static Regex {
    EXPRESSION_ID_RE.get_or_init(|| {
        Regex::new(r"\b(fact|attribute|metric|label|dataset)/([A-Za-z0-9_]+)\b")
            .expect("expression id pattern is valid")
    })
}

/// Qualified ids named by a query expression, left to right.
pub fn extract_expression_references(expr: &str) -> Vec<String> {
    expression_id_re()
        .captures_iter(expr)
        .map(|cap| format!("{}/{}", &cap[1], &cap[2]))
        .collect()
}

/// True iff the expression names at least one `metric/` id. This is the
/// sole signal splitting metrics into the non-dependent and dependent
/// phases.
pub fn has_metric_reference(expr: &str) -> bool {
    extract_expression_references(expr)
        .iter()
        .any(|id| id.starts_with("metric/"))
}

/// Ids referenced by a visualization's bucket items and filters, in
/// document order.
///
/// A plain measure contributes the id of the object it plots. A previous
/// period measure contributes every date dataset it shifts over, then the
/// measure it derives from. A relative date filter contributes the date
/// dataset it targets.
pub fn extract_visualization_references(content: &VisualizationContent) -> Vec<String> {
    let mut ids = Vec::new();

    for bucket in &content.buckets {
        for item in &bucket.items {
            let Some(measure) = &item.measure else {
                continue;
            };
            let Some(definition) = &measure.definition else {
                continue;
            };
            if let Some(simple) = &definition.measure_definition {
                ids.push(simple.item.identifier.id.clone());
            } else if let Some(previous) = &definition.previous_period_measure {
                for date_data_set in &previous.date_data_sets {
                    ids.push(date_data_set.data_set.identifier.id.clone());
                }
                ids.push(previous.measure_identifier.clone());
            }
        }
    }

    for filter in &content.filters {
        if let Some(relative) = &filter.relative_date_filter {
            ids.push(relative.data_set.identifier.id.clone());
        }
    }

    ids
}

/// Ids referenced by a dashboard layout: each widget's insight, then each
/// of its drill targets, in document order.
pub fn extract_dashboard_references(layout: &DashboardLayout) -> Vec<String> {
    let mut ids = Vec::new();

    for section in &layout.sections {
        for item in &section.items {
            let Some(widget) = &item.widget else {
                continue;
            };
            if let Some(insight) = &widget.insight {
                ids.push(insight.identifier.id.clone());
            }
            for drill in &widget.drills {
                if let Some(target) = &drill.target {
                    ids.push(target.identifier.id.clone());
                }
            }
        }
    }

    ids
}
