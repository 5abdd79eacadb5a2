use crate::models::{CleanRecord, Source};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;

/// Anything that can be collapsed by (product name, source site).
pub trait Deduplicate {
    fn dedup_key(&self) -> (&str, Source);

    /// Timestamp used to pick the newest duplicate; `None` keeps first-seen.
    fn timestamp(&self) -> Option<DateTime<FixedOffset>>;
}

impl Deduplicate for CleanRecord {
    fn dedup_key(&self) -> (&str, Source) {
        (&self.name, self.source)
    }

    fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        Some(self.createdat)
    }
}

/// Result of collapsing duplicate listings.
#[derive(Debug, Clone)]
pub struct DedupOutcome<T> {
    pub records: Vec<T>,
    pub removed: usize,
}

/// Summary of a deduplication pass, suitable for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub input_records: usize,
    pub output_records: usize,
    pub removed: usize,
}

impl<T> DedupOutcome<T> {
    pub fn stats(&self) -> DedupStats {
        DedupStats {
            input_records: self.records.len() + self.removed,
            output_records: self.records.len(),
            removed: self.removed,
        }
    }
}

/// Concatenates several tables into one, in order.
pub fn concat<T>(tables: impl IntoIterator<Item = Vec<T>>) -> Vec<T> {
    tables.into_iter().flatten().collect()
}

/// Keeps one record per (name, source): the one with the latest timestamp.
///
/// Ties, and records without a timestamp, keep the first one seen. Surviving
/// records stay in their original relative order.
pub fn deduplicate<T: Deduplicate>(records: Vec<T>) -> DedupOutcome<T> {
    let original_count = records.len();

    // key -> index of the current winner
    let mut winners: HashMap<(String, Source), usize> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        let (name, source) = record.dedup_key();
        match winners.get_mut(&(name.to_string(), source)) {
            None => {
                winners.insert((name.to_string(), source), idx);
            }
            Some(current) => {
                let newer = match (record.timestamp(), records[*current].timestamp()) {
                    (Some(candidate), Some(held)) => candidate > held,
                    (Some(_), None) => true,
                    _ => false,
                };
                if newer {
                    *current = idx;
                }
            }
        }
    }

    let mut keep = vec![false; original_count];
    for idx in winners.into_values() {
        keep[idx] = true;
    }
    let deduped: Vec<T> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, kept)| kept.then_some(record))
        .collect();

    let removed = original_count - deduped.len();
    tracing::info!("Removed {} duplicate records", removed);

    DedupOutcome {
        records: deduped,
        removed,
    }
}
