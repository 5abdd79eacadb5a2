/// Unit tests for record validation and cleaning
/// Tests the rule table, issue reporting and derived features
use scrape_pipeline::cleaning::{clean_record, extract_ram_gb, extract_storage_gb, quality_score};
use scrape_pipeline::models::{Category, RawRecord, Source};
use scrape_pipeline::validation::{validate_data, IssueKind, ValidationRules};
use serde_json::{json, Value};

fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

fn phone() -> Value {
    json!({
        "source": "zoommer.ge",
        "name": "Apple iPhone 15 Pro 256GB",
        "price": 3499.0,
        "brand": "Apple",
        "category": "phones",
        "description": "Titanium design, A17 Pro chip, 48MP main camera and USB-C.",
        "createdat": "2024-03-01T10:15:00+04:00",
        "url": "https://zoommer.ge/iphone-15-pro"
    })
}

fn with(field: &str, value: Value) -> RawRecord {
    let mut r = record(phone());
    r.insert(field.to_string(), value);
    r
}

fn without(field: &str) -> RawRecord {
    let mut r = record(phone());
    r.remove(field);
    r
}

#[cfg(test)]
mod required_field_tests {
    use super::*;

    #[test]
    fn test_complete_record_is_valid() {
        let (valid, report) = validate_data(&[record(phone())], &ValidationRules::default());
        assert_eq!(valid.len(), 1);
        assert_eq!(report.validation_rate, 1.0);
        assert_eq!(report.issue_total(), 0);
        assert_eq!(valid[0].source, Source::Zoommer);
        assert_eq!(valid[0].category, Category::Phones);
        assert!(valid[0].extra.contains_key("url"));
    }

    #[test]
    fn test_each_missing_required_field_invalidates() {
        let rules = ValidationRules::default();
        for field in &rules.required_fields {
            let (valid, report) = validate_data(&[without(field)], &rules);
            assert!(valid.is_empty(), "record without {} passed", field);
            assert_eq!(report.issue_counts[&IssueKind::MissingFields], 1);
            assert_eq!(report.missing_columns, vec![field.clone()]);
        }
    }

    #[test]
    fn test_null_and_empty_count_as_missing() {
        let rules = ValidationRules::default();
        let (valid, report) = validate_data(&[with("brand", Value::Null), with("name", json!(""))], &rules);
        assert!(valid.is_empty());
        assert_eq!(report.issue_counts[&IssueKind::MissingFields], 2);
        // missing values are not double-reported as too short
        assert_eq!(report.issue_counts[&IssueKind::InvalidNames], 0);
        assert_eq!(report.issue_counts[&IssueKind::InvalidBrands], 0);
        assert!(report.missing_columns.is_empty());
    }

    #[test]
    fn test_description_is_optional() {
        let (valid, _) = validate_data(&[without("description")], &ValidationRules::default());
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].description, None);
    }
}

#[cfg(test)]
mod field_rule_tests {
    use super::*;

    #[test]
    fn test_price_bounds_are_inclusive() {
        let rules = ValidationRules::default();
        let (valid, _) = validate_data(&[with("price", json!(0)), with("price", json!(50000))], &rules);
        assert_eq!(valid.len(), 2);

        let (valid, report) = validate_data(
            &[with("price", json!(-5)), with("price", json!(50000.01))],
            &rules,
        );
        assert!(valid.is_empty());
        assert_eq!(report.issue_counts[&IssueKind::InvalidPrices], 2);
        assert_eq!(report.issues[&IssueKind::InvalidPrices][0], "Row 0: price -5 out of range");
    }

    #[test]
    fn test_price_formats() {
        let rules = ValidationRules::default();
        let (valid, report) = validate_data(
            &[
                with("price", json!("1299.99")),
                with("price", json!("1,299")),
                with("price", json!(true)),
                with("price", json!("-5")),
            ],
            &rules,
        );
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].price, 1299.99);
        assert_eq!(
            report.issues[&IssueKind::InvalidPrices],
            vec![
                "Row 1: invalid price format",
                "Row 2: invalid price format",
                "Row 3: price -5 out of range",
            ]
        );
    }

    #[test]
    fn test_allow_lists() {
        let rules = ValidationRules::default();
        let (valid, report) = validate_data(
            &[
                with("category", json!("tablets")),
                with("source", json!("amazon.com")),
                with("source", json!("zoomer.ge")),
                with("category", json!("Phones")),
            ],
            &rules,
        );
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].source, Source::Zoommer);
        assert_eq!(report.issue_counts[&IssueKind::InvalidCategories], 2);
        assert_eq!(report.issue_counts[&IssueKind::InvalidSources], 1);
        assert_eq!(report.issues[&IssueKind::InvalidCategories][0], "Row 0: invalid category 'tablets'");
    }

    #[test]
    fn test_name_and_brand_lengths() {
        let rules = ValidationRules::default();
        let (valid, report) = validate_data(
            &[with("name", json!("TV")), with("name", json!("  LG C3  ")), with("brand", json!("   "))],
            &rules,
        );
        assert_eq!(valid.len(), 1);
        assert_eq!(report.issue_counts[&IssueKind::InvalidNames], 1);
        assert_eq!(report.issue_counts[&IssueKind::InvalidBrands], 1);
    }

    #[test]
    fn test_dates() {
        let rules = ValidationRules::default();
        let (valid, report) = validate_data(
            &[
                with("createdat", json!("2024-03-01")),
                with("createdat", json!("2024-03-01 10:00:00")),
                with("createdat", json!("yesterday")),
                with("createdat", json!("2024-13-45T99:00:00")),
            ],
            &rules,
        );
        assert_eq!(valid.len(), 2);
        assert_eq!(report.issue_counts[&IssueKind::InvalidDates], 2);
    }

    #[test]
    fn test_one_record_can_raise_several_issues() {
        let mut bad = with("price", json!(-1));
        bad.insert("category".into(), json!("toys"));
        let (valid, report) = validate_data(&[bad], &ValidationRules::default());
        assert!(valid.is_empty());
        assert_eq!(report.issue_total(), 2);
        assert_eq!(report.valid_records, 0);
        assert_eq!(report.total_records, 1);
    }

    #[test]
    fn test_custom_rules() {
        let rules: ValidationRules =
            serde_json::from_value(json!({"price_range": {"min": 100.0, "max": 1000.0}})).unwrap();
        assert!(rules.check().is_ok());
        assert_eq!(rules.name_min_length, 3);
        let (valid, _) = validate_data(&[record(phone())], &rules);
        assert!(valid.is_empty());
    }

    #[test]
    fn test_rules_must_keep_core_fields() {
        let rules: ValidationRules =
            serde_json::from_value(json!({"required_fields": ["name", "price"]})).unwrap();
        assert!(rules.check().is_err());
    }

    #[test]
    fn test_empty_batch() {
        let (valid, report) = validate_data(&[], &ValidationRules::default());
        assert!(valid.is_empty());
        assert_eq!(report.validation_rate, 0.0);
    }
}

#[cfg(test)]
mod cleaning_tests {
    use super::*;

    #[test]
    fn test_storage_and_ram_extraction() {
        assert_eq!(extract_storage_gb("iPhone 15 Pro 256GB"), Some(256));
        assert_eq!(extract_storage_gb("Lenovo Legion 16GB RAM 1TB SSD"), Some(1024));
        assert_eq!(extract_storage_gb("Samsung QLED 65\""), None);
        assert_eq!(extract_storage_gb("Pixel 8 128 GB"), None);
        assert_eq!(extract_ram_gb("Lenovo Legion 16GB RAM 1TB SSD"), Some(16));
        assert_eq!(extract_ram_gb("MacBook Air 8GB/256GB RAM"), Some(8));
        assert_eq!(extract_ram_gb("iPhone 15 Pro 256GB"), None);
    }

    #[test]
    fn test_quality_scores() {
        let long_desc = "x".repeat(200);
        let name20 = "y".repeat(20);
        assert_eq!(quality_score(&long_desc, &name20, Some(128)), 100);
        assert_eq!(quality_score(&"x".repeat(10), "abcde", None), 55);
        assert_eq!(quality_score("", &name20, Some(64)), 80);
    }

    #[test]
    fn test_clean_record_derives_features() {
        let mut raw = record(phone());
        raw.insert("name".into(), json!("  Apple   iPhone 15 Pro\t256GB "));
        raw.insert("storage_gb".into(), json!(1));
        let (mut valid, _) = validate_data(&[raw], &ValidationRules::default());
        let clean = clean_record(valid.remove(0));

        assert_eq!(clean.name, "Apple iPhone 15 Pro 256GB");
        assert_eq!(clean.storage_gb, Some(256));
        assert_eq!(clean.ram_gb, None);
        assert_eq!(clean.scrape_date.to_string(), "2024-03-01");
        assert_eq!(clean.scrape_hour, 10);
        assert_eq!(clean.scrape_weekday, "Friday");
        assert_eq!(clean.data_quality_score, 100);
        // stale derived values from the raw record are dropped
        assert!(!clean.extra.contains_key("storage_gb"));
        assert!(clean.extra.contains_key("url"));
    }
}
