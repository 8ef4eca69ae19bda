//! Tests for the reference extractors.

use glossa_annotate::document::{DashboardDoc, VisualizationDoc};
use glossa_annotate::extract::{
    extract_dashboard_references, extract_expression_references, extract_visualization_references,
    has_metric_reference,
};

fn visualization(yaml: &str) -> VisualizationDoc {
    serde_yaml::from_str(yaml).expect("test visualization parses")
}

fn dashboard(yaml: &str) -> DashboardDoc {
    serde_yaml::from_str(yaml).expect("test dashboard parses")
}

// ============================================================================
// Expression References
// ============================================================================

#[test]
fn expression_ids_in_document_order() {
    let ids = extract_expression_references(
        "metric/total_sales + fact/unit_price - metric/discount",
    );
    assert_eq!(
        ids,
        vec!["metric/total_sales", "fact/unit_price", "metric/discount"]
    );
}

#[test]
fn expression_duplicates_preserved() {
    let ids = extract_expression_references("metric/x + metric/x");
    assert_eq!(ids, vec!["metric/x", "metric/x"]);
}

#[test]
fn expression_ignores_unknown_categories() {
    let ids = extract_expression_references("insight/foo + label/bar + widget/baz");
    assert_eq!(ids, vec!["label/bar"]);
}

#[test]
fn expression_requires_word_boundaries() {
    assert!(extract_expression_references("somefact/x").is_empty());
    assert_eq!(extract_expression_references("(fact/x)"), vec!["fact/x"]);
}

#[test]
fn metric_reference_flag() {
    assert!(has_metric_reference(
        "metric/total_sales + fact/unit_price - metric/discount"
    ));
    assert!(!has_metric_reference("fact/unit_price * attribute/region"));
    assert!(!has_metric_reference(""));
}

// ============================================================================
// Visualization References
// ============================================================================

#[test]
fn previous_period_measure_emits_date_datasets_then_base_measure() {
    let doc = visualization(
        r#"
id: sales_over_time
title: Sales over time
content:
  buckets:
    - items:
        - measure:
            definition:
              previousPeriodMeasure:
                dateDataSets:
                  - dataSet:
                      identifier:
                        id: dataset/date
                measureIdentifier: metric/revenue
"#,
    );
    assert_eq!(
        extract_visualization_references(&doc.content),
        vec!["dataset/date", "metric/revenue"]
    );
}

#[test]
fn buckets_before_filters_duplicates_preserved() {
    let doc = visualization(
        r#"
id: revenue_by_region
title: Revenue by region
content:
  buckets:
    - items:
        - measure:
            definition:
              measureDefinition:
                item:
                  identifier:
                    id: metric/revenue
                    type: metric
        - measure:
            definition:
              measureDefinition:
                item:
                  identifier:
                    id: metric/revenue
                    type: metric
  filters:
    - relativeDateFilter:
        dataSet:
          identifier:
            id: dataset/date
        granularity: GDC.time.month
        from: -11
        to: 0
"#,
    );
    assert_eq!(
        extract_visualization_references(&doc.content),
        vec!["metric/revenue", "metric/revenue", "dataset/date"]
    );
}

#[test]
fn unrecognized_measure_shapes_yield_nothing() {
    let doc = visualization(
        r#"
id: derived
title: Derived
content:
  buckets:
    - items:
        - measure:
            definition:
              arithmeticMeasure:
                measureIdentifiers: [m1, m2]
                operator: sum
        - attribute:
            displayForm:
              identifier:
                id: label/region
  filters:
    - positiveAttributeFilter:
        displayForm:
          identifier:
            id: label/region
"#,
    );
    assert!(extract_visualization_references(&doc.content).is_empty());
}

#[test]
fn empty_visualization_content_yields_nothing() {
    let doc = visualization("id: empty\ntitle: Empty\n");
    assert!(extract_visualization_references(&doc.content).is_empty());
}

// ============================================================================
// Dashboard References
// ============================================================================

#[test]
fn dashboard_insights_then_drill_targets_per_widget() {
    let doc = dashboard(
        r#"
id: overview
title: Overview
layout:
  sections:
    - items:
        - widget:
            insight:
              identifier:
                id: visualization/sales_over_time
            drills:
              - target:
                  identifier:
                    id: dashboard/details
        - widget:
            insight:
              identifier:
                id: visualization/revenue_by_region
"#,
    );
    assert_eq!(
        extract_dashboard_references(&doc.layout),
        vec![
            "visualization/sales_over_time",
            "dashboard/details",
            "visualization/revenue_by_region"
        ]
    );
}

#[test]
fn dashboard_without_widgets_yields_nothing() {
    let doc = dashboard(
        r#"
id: empty
title: Empty
layout:
  sections:
    - items: []
"#,
    );
    assert!(extract_dashboard_references(&doc.layout).is_empty());
}
