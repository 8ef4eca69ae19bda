//! Property tests for the expression extractor.

use glossa_annotate::extract::{extract_expression_references, has_metric_reference};
use proptest::prelude::*;

proptest! {
    /// Every extracted id is a well-formed qualified id.
    #[test]
    fn extracted_ids_match_the_id_grammar(input in ".*") {
        let id_grammar = regex::Regex::new(
            r"^(fact|attribute|metric|label|dataset)/[A-Za-z0-9_]+$"
        ).unwrap();
        for id in extract_expression_references(&input) {
            prop_assert!(id_grammar.is_match(&id), "bad id extracted: {id}");
        }
    }

    /// The metric flag agrees with the extracted id list.
    #[test]
    fn metric_flag_agrees_with_extraction(input in ".*") {
        let ids = extract_expression_references(&input);
        prop_assert_eq!(
            has_metric_reference(&input),
            ids.iter().any(|id| id.starts_with("metric/"))
        );
    }

    /// Extraction is order-preserving over concatenation: references of
    /// `a + b` start with the references of `a`.
    #[test]
    fn concatenation_preserves_prefix(a in "[a-z/+ ()0-9]*", b in "[a-z/+ ()0-9]*") {
        let combined = format!("{a} {b}");
        let first = extract_expression_references(&a);
        let all = extract_expression_references(&combined);
        prop_assert!(all.len() >= first.len());
        prop_assert_eq!(&all[..first.len()], &first[..]);
    }
}
