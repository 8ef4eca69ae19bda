//! Tests for prompt assembly.

use glossa_annotate::cache::DescriptionCache;
use glossa_annotate::prompt::{self, LeafDetail, NO_DESCRIPTION};
use glossa_annotate::ObjectKind;

#[test]
fn leaf_prompt_states_short_budget_and_fields() {
    let tags = vec!["commerce".to_string(), "core".to_string()];
    let text = prompt::leaf(
        ObjectKind::Fact,
        "Unit price",
        "fact/unit_price",
        &LeafDetail {
            source_column: Some("unit_price"),
            source_column_type: Some("NUMERIC"),
            tags: &tags,
            ..Default::default()
        },
    );
    assert!(text.contains("for a fact"));
    assert!(text.contains("128 characters"));
    assert!(text.contains("Title: Unit price"));
    assert!(text.contains("ID: fact/unit_price"));
    assert!(text.contains("Source column: unit_price"));
    assert!(text.contains("Source column type: NUMERIC"));
    assert!(text.contains("Tags: commerce, core"));
}

#[test]
fn leaf_prompt_omits_absent_fields() {
    let text = prompt::leaf(
        ObjectKind::Dataset,
        "Customers",
        "dataset/customers",
        &LeafDetail::default(),
    );
    assert!(!text.contains("Source column"));
    assert!(!text.contains("Value type"));
    assert!(!text.contains("Tags:"));
}

#[test]
fn date_instance_prompt_lists_granularities() {
    let granularities = vec!["DAY".to_string(), "MONTH".to_string(), "YEAR".to_string()];
    let text = prompt::date_instance("Date", "dataset/date", &granularities, Some("title: en-US"));
    assert!(text.contains("for a date instance"));
    assert!(text.contains("128 characters"));
    assert!(text.contains("Granularities: DAY, MONTH, YEAR"));
    assert!(text.contains("Granularity formatting: title: en-US"));
}

#[test]
fn metric_prompt_shows_raw_expression_and_long_budget() {
    let text = prompt::metric(
        "Net revenue",
        "metric/net_revenue",
        "SELECT SUM(fact/unit_price) - metric/discount",
        Some("$#,##0.00"),
    );
    assert!(text.contains("256 characters"));
    assert!(text.contains("not a dataset"));
    assert!(text.contains("MAQL: SELECT SUM(fact/unit_price) - metric/discount"));
    assert!(text.contains("Format: $#,##0.00"));
}

#[test]
fn visualization_prompt_resolves_context_from_cache_in_order() {
    let mut cache = DescriptionCache::new();
    cache
        .insert("metric/revenue", "Total booked revenue.".into())
        .unwrap();

    let references = vec!["metric/revenue".to_string(), "dataset/date".to_string()];
    let text = prompt::visualization(
        "Sales over time",
        "visualization/sales_over_time",
        Some("local:line"),
        &cache,
        &references,
    );

    assert!(text.contains("256 characters"));
    assert!(text.contains("Visualization URL: local:line"));
    let revenue_line = "metric/revenue: Total booked revenue.";
    let date_line = format!("dataset/date: {NO_DESCRIPTION}");
    assert!(text.contains(revenue_line));
    assert!(text.contains(&date_line));
    assert!(text.find(revenue_line).unwrap() < text.find(&date_line).unwrap());
}

#[test]
fn dashboard_prompt_has_context_but_no_url() {
    let cache = DescriptionCache::new();
    let references = vec!["visualization/sales_over_time".to_string()];
    let text = prompt::dashboard("Overview", "dashboard/overview", &cache, &references);
    assert!(text.contains("for an analytical dashboard"));
    assert!(text.contains("256 characters"));
    assert!(!text.contains("Visualization URL"));
    assert!(text.contains(&format!(
        "visualization/sales_over_time: {NO_DESCRIPTION}"
    )));
}
