/// Normalization and feature derivation for validated records.
///
/// Everything here is a pure function of its input:
/// 1. Collapse whitespace in text fields
/// 2. Derive calendar features from the scrape timestamp
/// 3. Extract storage and RAM capacity from the product name
/// 4. Score how complete the listing is
use crate::models::{CleanRecord, ValidRecord, DERIVED_COLUMNS};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static STORAGE_GB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)GB").unwrap());
static STORAGE_TB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)TB").unwrap());
static RAM_GB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)GB.*RAM").unwrap());

const DESCRIPTION_MIN_CHARS: usize = 50;
const NAME_MIN_CHARS: usize = 10;
const SHORT_DESCRIPTION_PENALTY: i32 = 20;
const SHORT_NAME_PENALTY: i32 = 15;
const MISSING_STORAGE_PENALTY: i32 = 10;

/// Offset-carrying formats tried after RFC 3339.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Formats without an offset; these are read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Trims and collapses every whitespace run to a single space.
///
/// Idempotent: `normalize_text(&normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Parses an ISO-8601 timestamp as scrapers write it.
///
/// Accepts RFC 3339 (`Z` or numeric offset), naive date-times with `T` or a
/// space separator, and bare dates. Naive values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    let utc = FixedOffset::east_opt(0)?;
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| utc.from_utc_datetime(&naive))
}

/// Storage capacity in GB: the first `NNGB` in the name, overridden by any
/// `NNTB` (×1024).
pub fn extract_storage_gb(name: &str) -> Option<u64> {
    let gb = first_capture(&STORAGE_GB, name);
    let tb = first_capture(&STORAGE_TB, name).and_then(|tb| tb.checked_mul(1024));
    tb.or(gb)
}

/// RAM in GB, from an `NNGB ... RAM` phrase.
pub fn extract_ram_gb(name: &str) -> Option<u64> {
    first_capture(&RAM_GB, name)
}

fn first_capture(pattern: &Regex, text: &str) -> Option<u64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Completeness score in `0..=100`.
///
/// Starts at 100 and deducts 20 for a description under 50 characters,
/// 15 for a name under 10 characters and 10 when no storage capacity could
/// be extracted.
pub fn quality_score(description: &str, name: &str, storage_gb: Option<u64>) -> u8 {
    let mut score: i32 = 100;
    if description.chars().count() < DESCRIPTION_MIN_CHARS {
        score -= SHORT_DESCRIPTION_PENALTY;
    }
    if name.chars().count() < NAME_MIN_CHARS {
        score -= SHORT_NAME_PENALTY;
    }
    if storage_gb.is_none() {
        score -= MISSING_STORAGE_PENALTY;
    }
    score.clamp(0, 100) as u8
}

/// Cleans one validated record.
pub fn clean_record(record: ValidRecord) -> CleanRecord {
    let name = normalize_text(&record.name);
    let brand = normalize_text(&record.brand);
    let description = record
        .description
        .as_deref()
        .map(normalize_text)
        .unwrap_or_default();

    let storage_gb = extract_storage_gb(&name);
    let ram_gb = extract_ram_gb(&name);
    let data_quality_score = quality_score(&description, &name, storage_gb);

    let mut extra = record.extra;
    extra.retain(|key, _| !DERIVED_COLUMNS.contains(&key.as_str()));

    let createdat = record.createdat;
    CleanRecord {
        source: record.source,
        name,
        price: record.price,
        brand,
        category: record.category,
        description,
        createdat,
        scrape_date: createdat.date_naive(),
        scrape_hour: createdat.hour(),
        scrape_weekday: createdat.format("%A").to_string(),
        storage_gb,
        ram_gb,
        data_quality_score,
        extra,
    }
}

/// Cleans a batch of validated records, preserving order.
pub fn clean_data(records: Vec<ValidRecord>) -> Vec<CleanRecord> {
    let cleaned: Vec<CleanRecord> = records.into_iter().map(clean_record).collect();
    tracing::info!("Data cleaning complete: {} records processed", cleaned.len());
    cleaned
}

/// Mean quality score of a batch, `None` when empty.
pub fn average_quality(records: &[CleanRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.data_quality_score as f64).sum();
    Some(total / records.len() as f64)
}
