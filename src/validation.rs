//! Record-level validation of raw scraper output.
//!
//! Rules live in a configuration table ([`FIELD_RULES`]) keyed by field name
//! rather than in scattered conditionals. A record is valid only when every
//! required field is present and non-empty and every field predicate passes.
//! Failures are accumulated into a [`ValidationReport`]; nothing here returns
//! an error.

use crate::cleaning::parse_timestamp;
use crate::errors::PipelineError;
use crate::models::{Category, RawRecord, Source, ValidRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Inclusive price bounds (GEL).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Canonical validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub required_fields: Vec<String>,
    pub price_range: PriceRange,
    pub valid_categories: BTreeSet<Category>,
    pub valid_sources: BTreeSet<Source>,
    pub name_min_length: usize,
    pub brand_min_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required_fields: ["source", "name", "price", "brand", "category", "createdat"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            price_range: PriceRange {
                min: 0.0,
                max: 50_000.0,
            },
            valid_categories: Category::ALL.into_iter().collect(),
            valid_sources: Source::ALL.into_iter().collect(),
            name_min_length: 3,
            brand_min_length: 1,
        }
    }
}

impl ValidationRules {
    /// Rejects configurations that could never accept a record.
    pub fn check(&self) -> Result<(), PipelineError> {
        if !(self.price_range.min <= self.price_range.max) {
            return Err(PipelineError::Config(format!(
                "price_range.min ({}) exceeds price_range.max ({})",
                self.price_range.min, self.price_range.max
            )));
        }
        if self.valid_categories.is_empty() {
            return Err(PipelineError::Config("valid_categories is empty".into()));
        }
        if self.valid_sources.is_empty() {
            return Err(PipelineError::Config("valid_sources is empty".into()));
        }
        for field in CORE_FIELDS {
            if !self.required_fields.iter().any(|f| f == field) {
                return Err(PipelineError::Config(format!(
                    "required_fields must include '{}'",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Fields a clean record cannot be built without.
const CORE_FIELDS: [&str; 6] = ["source", "name", "price", "brand", "category", "createdat"];

/// Category of a validation issue, one bucket per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingFields,
    InvalidPrices,
    InvalidCategories,
    InvalidSources,
    InvalidNames,
    InvalidBrands,
    InvalidDates,
}

impl IssueKind {
    pub const ALL: [IssueKind; 7] = [
        IssueKind::MissingFields,
        IssueKind::InvalidPrices,
        IssueKind::InvalidCategories,
        IssueKind::InvalidSources,
        IssueKind::InvalidNames,
        IssueKind::InvalidBrands,
        IssueKind::InvalidDates,
    ];
}

/// One row of the rule table.
pub struct FieldRule {
    pub field: &'static str,
    pub issue: IssueKind,
    /// Returns a short description of the problem when the value fails.
    pub check: fn(&Value, &ValidationRules) -> Result<(), String>,
}

/// Per-field predicates, applied to every present, non-empty field.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: "price",
        issue: IssueKind::InvalidPrices,
        check: check_price,
    },
    FieldRule {
        field: "category",
        issue: IssueKind::InvalidCategories,
        check: check_category,
    },
    FieldRule {
        field: "source",
        issue: IssueKind::InvalidSources,
        check: check_source,
    },
    FieldRule {
        field: "name",
        issue: IssueKind::InvalidNames,
        check: check_name,
    },
    FieldRule {
        field: "brand",
        issue: IssueKind::InvalidBrands,
        check: check_brand,
    },
    FieldRule {
        field: "createdat",
        issue: IssueKind::InvalidDates,
        check: check_date,
    },
];

fn check_price(value: &Value, rules: &ValidationRules) -> Result<(), String> {
    let price = parse_price(value).ok_or_else(|| "invalid price format".to_string())?;
    if price < rules.price_range.min || price > rules.price_range.max {
        return Err(format!("price {} out of range", price));
    }
    Ok(())
}

fn check_category(value: &Value, rules: &ValidationRules) -> Result<(), String> {
    match value.as_str().and_then(Category::parse) {
        Some(c) if rules.valid_categories.contains(&c) => Ok(()),
        _ => Err(format!("invalid category '{}'", display_value(value))),
    }
}

fn check_source(value: &Value, rules: &ValidationRules) -> Result<(), String> {
    match value.as_str().and_then(Source::parse) {
        Some(s) if rules.valid_sources.contains(&s) => Ok(()),
        _ => Err(format!("invalid source '{}'", display_value(value))),
    }
}

fn check_name(value: &Value, rules: &ValidationRules) -> Result<(), String> {
    match text_value(value) {
        Some(name) if name.trim().chars().count() >= rules.name_min_length => Ok(()),
        _ => Err("name too short".to_string()),
    }
}

fn check_brand(value: &Value, rules: &ValidationRules) -> Result<(), String> {
    match text_value(value) {
        Some(brand) if brand.trim().chars().count() >= rules.brand_min_length => Ok(()),
        _ => Err("brand too short".to_string()),
    }
}

fn check_date(value: &Value, _rules: &ValidationRules) -> Result<(), String> {
    value
        .as_str()
        .and_then(parse_timestamp)
        .map(|_| ())
        .ok_or_else(|| "invalid date format".to_string())
}

/// Parses a price from a JSON number or a numeric string.
///
/// Booleans, non-finite values and anything else are rejected.
pub fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

/// Text content of a scalar field; numbers are rendered as text.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Absent, null and empty-string values all count as missing.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Outcome of validating one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_records: usize,
    pub valid_records: usize,
    /// valid / total; 0 for an empty batch.
    pub validation_rate: f64,
    /// Required fields absent from every record of the batch.
    pub missing_columns: Vec<String>,
    pub issues: BTreeMap<IssueKind, Vec<String>>,
    pub issue_counts: BTreeMap<IssueKind, usize>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            total_records: 0,
            valid_records: 0,
            validation_rate: 0.0,
            missing_columns: Vec::new(),
            issues: IssueKind::ALL.into_iter().map(|k| (k, Vec::new())).collect(),
            issue_counts: IssueKind::ALL.into_iter().map(|k| (k, 0)).collect(),
        }
    }
}

impl ValidationReport {
    fn push(&mut self, kind: IssueKind, message: String) {
        self.issues.entry(kind).or_default().push(message);
        *self.issue_counts.entry(kind).or_default() += 1;
    }

    fn finish(&mut self) {
        self.validation_rate = if self.total_records > 0 {
            self.valid_records as f64 / self.total_records as f64
        } else {
            0.0
        };
    }

    /// Total number of issues across all categories.
    pub fn issue_total(&self) -> usize {
        self.issue_counts.values().sum()
    }

    /// Folds another batch's report into this one, prefixing its messages.
    pub fn merge(&mut self, other: &ValidationReport, label: &str) {
        self.total_records += other.total_records;
        self.valid_records += other.valid_records;
        for column in &other.missing_columns {
            if !self.missing_columns.contains(column) {
                self.missing_columns.push(column.clone());
            }
        }
        for (kind, messages) in &other.issues {
            for message in messages {
                self.push(*kind, format!("{}: {}", label, message));
            }
        }
        self.finish();
    }
}

/// Validates a batch of raw records.
///
/// Returns the valid subset, in input order, with fields parsed, plus a
/// report of every issue found.
pub fn validate_data(
    records: &[RawRecord],
    rules: &ValidationRules,
) -> (Vec<ValidRecord>, ValidationReport) {
    let mut report = ValidationReport {
        total_records: records.len(),
        ..Default::default()
    };

    if records.is_empty() {
        return (Vec::new(), report);
    }

    report.missing_columns = rules
        .required_fields
        .iter()
        .filter(|field| records.iter().all(|r| !r.contains_key(field.as_str())))
        .cloned()
        .collect();
    if !report.missing_columns.is_empty() {
        tracing::warn!("Missing required fields: {:?}", report.missing_columns);
    }

    let mut valid = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let mut is_valid = true;

        for field in &rules.required_fields {
            if is_missing(record.get(field)) {
                report.push(
                    IssueKind::MissingFields,
                    format!("Row {}: missing {}", idx, field),
                );
                is_valid = false;
            }
        }

        for rule in FIELD_RULES {
            let Some(value) = record.get(rule.field) else {
                continue;
            };
            if is_missing(Some(value)) {
                continue;
            }
            if let Err(problem) = (rule.check)(value, rules) {
                report.push(rule.issue, format!("Row {}: {}", idx, problem));
                is_valid = false;
            }
        }

        if !is_valid {
            continue;
        }
        match build_valid_record(record) {
            Some(parsed) => valid.push(parsed),
            None => {
                // Only reachable with rules that drop a core field from required_fields
                report.push(
                    IssueKind::MissingFields,
                    format!("Row {}: incomplete record", idx),
                );
            }
        }
    }

    report.valid_records = valid.len();
    report.finish();

    tracing::info!(
        "Validation complete: {}/{} records valid ({:.2}%)",
        report.valid_records,
        report.total_records,
        report.validation_rate * 100.0
    );

    (valid, report)
}

fn build_valid_record(record: &RawRecord) -> Option<ValidRecord> {
    let extra = record
        .iter()
        .filter(|(k, _)| !CORE_FIELDS.contains(&k.as_str()) && k.as_str() != "description")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Some(ValidRecord {
        source: record.get("source")?.as_str().and_then(Source::parse)?,
        name: text_value(record.get("name")?)?,
        price: parse_price(record.get("price")?)?,
        brand: text_value(record.get("brand")?)?,
        category: record.get("category")?.as_str().and_then(Category::parse)?,
        description: record.get("description").and_then(text_value),
        createdat: record.get("createdat")?.as_str().and_then(parse_timestamp)?,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn good() -> Value {
        json!({
            "source": "zoommer.ge",
            "name": "Apple iPhone 15 Pro 256GB",
            "price": "3499.99",
            "brand": "Apple",
            "category": "phones",
            "description": "Titanium design with A17 Pro chip",
            "createdat": "2024-03-01T10:15:00Z",
            "url": "https://zoommer.ge/iphone"
        })
    }

    #[test]
    fn test_valid_record_is_parsed() {
        let (valid, report) = validate_data(&[raw(good())], &ValidationRules::default());
        assert_eq!(valid.len(), 1);
        assert_eq!(report.valid_records, 1);
        assert_eq!(report.validation_rate, 1.0);
        assert_eq!(valid[0].price, 3499.99);
        assert_eq!(valid[0].source, Source::Zoommer);
        assert_eq!(valid[0].extra.get("url"), Some(&json!("https://zoommer.ge/iphone")));
        assert_eq!(report.issue_total(), 0);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        for (price, ok) in [
            (json!(0), true),
            (json!(50000), true),
            (json!(-0.01), false),
            (json!(50000.01), false),
            (json!("abc"), false),
            (json!(true), false),
            (json!("NaN"), false),
        ] {
            let mut record = good();
            record["price"] = price.clone();
            let (valid, _) = validate_data(&[raw(record)], &ValidationRules::default());
            assert_eq!(valid.len() == 1, ok, "price {}", price);
        }
    }

    #[test]
    fn test_each_issue_kind_is_reported() {
        let mut record = good();
        record["category"] = json!("toasters");
        record["source"] = json!("amazon.com");
        record["name"] = json!("  ab ");
        record["brand"] = json!("   ");
        record["createdat"] = json!("yesterday");
        let (valid, report) = validate_data(&[raw(record)], &ValidationRules::default());
        assert!(valid.is_empty());
        for kind in [
            IssueKind::InvalidCategories,
            IssueKind::InvalidSources,
            IssueKind::InvalidNames,
            IssueKind::InvalidBrands,
            IssueKind::InvalidDates,
        ] {
            assert_eq!(report.issue_counts[&kind], 1, "{:?}", kind);
        }
        assert_eq!(report.issues[&IssueKind::InvalidCategories][0], "Row 0: invalid category 'toasters'");
    }

    #[test]
    fn test_missing_and_empty_fields_are_invalid() {
        let mut no_brand = raw(good());
        no_brand.remove("brand");
        let mut empty_name = good();
        empty_name["name"] = json!("");
        let mut null_price = good();
        null_price["price"] = Value::Null;

        let (valid, report) = validate_data(
            &[no_brand, raw(empty_name), raw(null_price)],
            &ValidationRules::default(),
        );
        assert!(valid.is_empty());
        assert_eq!(report.issue_counts[&IssueKind::MissingFields], 3);
        // Missing values are not double-reported by the field predicates
        assert_eq!(report.issue_counts[&IssueKind::InvalidPrices], 0);
        assert!(report.missing_columns.is_empty());
    }

    #[test]
    fn test_missing_column_across_batch() {
        let mut a = raw(good());
        a.remove("createdat");
        let (_, report) = validate_data(&[a], &ValidationRules::default());
        assert_eq!(report.missing_columns, vec!["createdat".to_string()]);
    }

    #[test]
    fn test_empty_batch() {
        let (valid, report) = validate_data(&[], &ValidationRules::default());
        assert!(valid.is_empty());
        assert_eq!(report.validation_rate, 0.0);
        assert_eq!(report.issues.len(), IssueKind::ALL.len());
    }

    #[test]
    fn test_restricted_allow_list() {
        let rules = ValidationRules {
            valid_sources: [Source::Ee].into_iter().collect(),
            ..Default::default()
        };
        let (valid, report) = validate_data(&[raw(good())], &rules);
        assert!(valid.is_empty());
        assert_eq!(report.issue_counts[&IssueKind::InvalidSources], 1);
    }

    #[test]
    fn test_rules_check() {
        assert!(ValidationRules::default().check().is_ok());
        let inverted = ValidationRules {
            price_range: PriceRange { min: 10.0, max: 1.0 },
            ..Default::default()
        };
        assert!(inverted.check().is_err());
        let mut partial = ValidationRules::default();
        partial.required_fields.retain(|f| f != "price");
        assert!(partial.check().is_err());
    }

    #[test]
    fn test_merge_sums_and_labels() {
        let (_, a) = validate_data(&[raw(good())], &ValidationRules::default());
        let mut bad = good();
        bad["price"] = json!("-5");
        let (_, b) = validate_data(&[raw(bad)], &ValidationRules::default());

        let mut total = ValidationReport::default();
        total.merge(&a, "a.json");
        total.merge(&b, "b.json");
        assert_eq!(total.total_records, 2);
        assert_eq!(total.valid_records, 1);
        assert_eq!(total.validation_rate, 0.5);
        assert_eq!(
            total.issues[&IssueKind::InvalidPrices],
            vec!["b.json: Row 0: price -5 out of range".to_string()]
        );
    }
}
