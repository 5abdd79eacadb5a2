use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============ Enumerated Sets ============

/// Retail sites the scrapers collect from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    /// zoommer.ge (the spider was registered under the `zoomer.ge` domain).
    #[serde(rename = "zoommer.ge", alias = "zoomer.ge")]
    Zoommer,
    /// ee.ge
    #[serde(rename = "ee.ge")]
    Ee,
    /// alta.ge
    #[serde(rename = "alta.ge")]
    Alta,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Zoommer, Source::Ee, Source::Alta];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Zoommer => "zoommer.ge",
            Source::Ee => "ee.ge",
            Source::Alta => "alta.ge",
        }
    }

    /// Parses the site name exactly as scrapers write it.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "zoommer.ge" | "zoomer.ge" => Some(Source::Zoommer),
            "ee.ge" => Some(Source::Ee),
            "alta.ge" => Some(Source::Alta),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product categories the scrapers cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Phones,
    Laptops,
    Fridges,
    Tvs,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Phones,
        Category::Laptops,
        Category::Fridges,
        Category::Tvs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Phones => "phones",
            Category::Laptops => "laptops",
            Category::Fridges => "fridges",
            Category::Tvs => "tvs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Records ============

/// One scraped listing exactly as it appears in the scraper's JSON output.
pub type RawRecord = serde_json::Map<String, Value>;

/// A record that passed every validation check, with its fields parsed
/// but not yet normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    pub source: Source,
    pub name: String,
    pub price: f64,
    pub brand: String,
    pub category: Category,
    /// `None` when the scraper did not capture a description.
    pub description: Option<String>,
    pub createdat: DateTime<FixedOffset>,
    /// Every other field of the raw record, untouched.
    pub extra: BTreeMap<String, Value>,
}

/// A validated, normalized record with derived feature columns.
///
/// Serializes in "records" orientation: one flat JSON object per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub source: Source,
    pub name: String,
    pub price: f64,
    pub brand: String,
    pub category: Category,
    pub description: String,
    pub createdat: DateTime<FixedOffset>,
    pub scrape_date: NaiveDate,
    pub scrape_hour: u32,
    pub scrape_weekday: String,
    pub storage_gb: Option<u64>,
    pub ram_gb: Option<u64>,
    pub data_quality_score: u8,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fixed tabular columns, in export order.
pub const BASE_COLUMNS: [&str; 13] = [
    "source",
    "name",
    "price",
    "brand",
    "category",
    "description",
    "createdat",
    "scrape_date",
    "scrape_hour",
    "scrape_weekday",
    "storage_gb",
    "ram_gb",
    "data_quality_score",
];

/// Columns the cleaner derives; stale copies found in input are discarded.
pub const DERIVED_COLUMNS: [&str; 7] = [
    "scrape_date",
    "scrape_hour",
    "scrape_weekday",
    "storage_gb",
    "storage_tb",
    "ram_gb",
    "data_quality_score",
];

/// A single typed table cell, shared by the CSV and spreadsheet writers.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Textual rendering used for CSV output.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Empty => String::new(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl CleanRecord {
    /// Value of one tabular column for this record.
    pub fn cell(&self, column: &str) -> Cell {
        match column {
            "source" => Cell::Text(self.source.to_string()),
            "name" => Cell::Text(self.name.clone()),
            "price" => Cell::Number(self.price),
            "brand" => Cell::Text(self.brand.clone()),
            "category" => Cell::Text(self.category.to_string()),
            "description" => Cell::Text(self.description.clone()),
            "createdat" => Cell::Text(self.createdat.to_rfc3339()),
            "scrape_date" => Cell::Text(self.scrape_date.to_string()),
            "scrape_hour" => Cell::Number(self.scrape_hour as f64),
            "scrape_weekday" => Cell::Text(self.scrape_weekday.clone()),
            "storage_gb" => self
                .storage_gb
                .map_or(Cell::Empty, |v| Cell::Number(v as f64)),
            "ram_gb" => self.ram_gb.map_or(Cell::Empty, |v| Cell::Number(v as f64)),
            "data_quality_score" => Cell::Number(self.data_quality_score as f64),
            other => match self.extra.get(other) {
                None | Some(Value::Null) => Cell::Empty,
                Some(Value::String(s)) => Cell::Text(s.clone()),
                Some(Value::Number(n)) => n.as_f64().map_or(Cell::Empty, Cell::Number),
                Some(Value::Bool(b)) => Cell::Text(b.to_string()),
                // Arrays and objects are embedded as compact JSON
                Some(v) => Cell::Text(v.to_string()),
            },
        }
    }
}

/// Column schema for a table: fixed columns followed by the sorted union of
/// every record's extra fields.
pub fn columns(records: &[CleanRecord]) -> Vec<String> {
    let extras: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .filter(|k| !BASE_COLUMNS.contains(k))
        .collect();

    BASE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(extras.into_iter().map(str::to_string))
        .collect()
}
