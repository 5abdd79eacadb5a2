//! Reading raw scraper output.
//!
//! Scrapers write JSON arrays of flat objects. A file that cannot be used is
//! reported and skipped; the run continues with whatever else loaded.

use crate::errors::{PipelineError, ResultExt};
use crate::models::RawRecord;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Records loaded from one input file.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub path: PathBuf,
    pub records: Vec<RawRecord>,
}

/// A file that was skipped and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading several files.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub batches: Vec<RawBatch>,
    pub failures: Vec<LoadFailure>,
}

impl LoadOutcome {
    pub fn total_records(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }
}

/// Loads one JSON file of raw records.
///
/// Accepts an array of objects or a single object. Array elements that are
/// not objects are skipped with a warning. Empty and malformed files are
/// errors.
pub fn load_raw_data(path: &Path) -> Result<Vec<RawRecord>, PipelineError> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    if text.trim().is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "{} is empty",
            path.display()
        )));
    }

    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let records = match value {
        Value::Array(items) => {
            let total = items.len();
            let records: Vec<RawRecord> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            if records.len() < total {
                tracing::warn!(
                    "Skipped {} non-object entries in {}",
                    total - records.len(),
                    path.display()
                );
            }
            records
        }
        Value::Object(map) => vec![map],
        other => {
            return Err(PipelineError::InvalidInput(format!(
                "{} holds a JSON {} instead of records",
                path.display(),
                json_kind(&other)
            )))
        }
    };

    tracing::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loads every file, skipping (and recording) the ones that fail.
pub fn load_many(paths: &[PathBuf]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    for path in paths {
        match load_raw_data(path) {
            Ok(records) => outcome.batches.push(RawBatch {
                path: path.clone(),
                records,
            }),
            Err(e) => {
                tracing::error!("Error loading data from {}: {}", path.display(), e);
                outcome.failures.push(LoadFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    if !outcome.batches.is_empty() {
        tracing::info!(
            "Aggregated {} records from {} files",
            outcome.total_records(),
            outcome.batches.len()
        );
    }
    outcome
}

/// Expands input arguments: directories become their `*.json` files (sorted).
///
/// Fails on the first path that does not exist.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("listing {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            if found.is_empty() {
                tracing::warn!("No JSON files found in {}", input.display());
            }
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            return Err(PipelineError::InvalidInput(format!(
                "Input file not found: {}",
                input.display()
            )));
        }
    }
    Ok(files)
}
