/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use scrape_pipeline::cleaning::{extract_storage_gb, normalize_text, parse_timestamp, quality_score};
use scrape_pipeline::dedup::{deduplicate, Deduplicate};
use scrape_pipeline::models::{RawRecord, Source};
use scrape_pipeline::validation::{parse_price, validate_data, ValidationRules};
use serde_json::{json, Value};
use std::collections::HashSet;

fn raw(price: Value) -> RawRecord {
    let value = json!({
        "source": "ee.ge",
        "name": "Samsung Galaxy S24 256GB",
        "price": price,
        "brand": "Samsung",
        "category": "phones",
        "createdat": "2024-03-01T10:00:00",
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

// Property: text normalization is idempotent and never leaves runs of spaces
proptest! {
    #[test]
    fn normalize_text_is_idempotent(text in "\\PC*") {
        let once = normalize_text(&text);
        prop_assert_eq!(normalize_text(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert_eq!(once.trim(), once.as_str());
    }

    #[test]
    fn normalize_text_handles_mixed_whitespace(words in prop::collection::vec("[a-zA-Z0-9]{1,8}", 1..6), pad in "[ \t\n]{1,4}") {
        let messy = format!("{}{}{}", pad, words.join(&pad), pad);
        prop_assert_eq!(normalize_text(&messy), words.join(" "));
    }
}

// Property: parsers never panic
proptest! {
    #[test]
    fn parse_timestamp_never_panics(text in "\\PC*") {
        let _ = parse_timestamp(&text);
    }

    #[test]
    fn parse_price_never_panics(text in "\\PC*") {
        let _ = parse_price(&Value::String(text));
    }

    #[test]
    fn storage_extraction_never_panics(name in "\\PC*") {
        let _ = extract_storage_gb(&name);
    }
}

// Property: price range is enforced at both ends
proptest! {
    #[test]
    fn prices_in_range_are_valid(price in 0.0f64..=50_000.0) {
        let (valid, report) = validate_data(&[raw(json!(price))], &ValidationRules::default());
        prop_assert_eq!(valid.len(), 1);
        prop_assert_eq!(report.validation_rate, 1.0);
    }

    #[test]
    fn prices_out_of_range_are_invalid(price in prop_oneof![-1.0e6f64..-0.001, 50_000.001f64..1.0e7]) {
        let (valid, report) = validate_data(&[raw(json!(price))], &ValidationRules::default());
        prop_assert!(valid.is_empty());
        prop_assert_eq!(report.valid_records, 0);
    }

    #[test]
    fn numeric_strings_parse_like_numbers(price in 0u32..50_000) {
        let (valid, _) = validate_data(&[raw(json!(price.to_string()))], &ValidationRules::default());
        prop_assert_eq!(valid.len(), 1);
        prop_assert_eq!(valid[0].price, price as f64);
    }
}

// Property: quality score stays within bounds
proptest! {
    #[test]
    fn quality_score_is_bounded(desc in "\\PC{0,80}", name in "\\PC{0,30}", storage in proptest::option::of(1u64..4096)) {
        let score = quality_score(&desc, &name, storage);
        prop_assert!((55..=100).contains(&score));
    }
}

#[derive(Debug, Clone)]
struct Row {
    name: String,
    source: Source,
    day: u32,
}

impl Deduplicate for Row {
    fn dedup_key(&self) -> (&str, Source) {
        (&self.name, self.source)
    }

    fn timestamp(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        parse_timestamp(&format!("2024-03-{:02}T12:00:00Z", self.day))
    }
}

fn any_source() -> impl Strategy<Value = Source> {
    prop_oneof![Just(Source::Zoommer), Just(Source::Ee), Just(Source::Alta)]
}

// Property: deduplication keeps exactly one row per key, the newest one
proptest! {
    #[test]
    fn dedup_keeps_one_latest_row_per_key(
        rows in prop::collection::vec(("[a-c]", any_source(), 1u32..28), 0..40)
    ) {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|(name, source, day)| Row { name, source, day })
            .collect();
        let input = rows.clone();
        let outcome = deduplicate(rows);

        let keys: HashSet<(String, Source)> =
            input.iter().map(|r| (r.name.clone(), r.source)).collect();
        prop_assert_eq!(outcome.records.len(), keys.len());
        prop_assert_eq!(outcome.removed, input.len() - keys.len());

        for kept in &outcome.records {
            let newest = input
                .iter()
                .filter(|r| r.name == kept.name && r.source == kept.source)
                .map(|r| r.day)
                .max()
                .unwrap();
            prop_assert_eq!(kept.day, newest);
        }
    }
}
