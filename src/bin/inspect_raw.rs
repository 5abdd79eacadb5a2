//! Utility to inspect raw scraper output and print per-field coverage.

use clap::Parser;
use scrape_pipeline::loader::load_raw_data;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Print record counts and field presence for raw JSON files.
#[derive(Parser, Debug)]
#[command(name = "inspect-raw")]
struct Args {
    /// Raw JSON files.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Default)]
struct FieldCoverage {
    present: usize,
    empty: usize,
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut failed = 0;
    for path in &args.files {
        let records = match load_raw_data(path) {
            Ok(records) => records,
            Err(e) => {
                println!("{}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        let mut fields: BTreeMap<&str, FieldCoverage> = BTreeMap::new();
        for record in &records {
            for (key, value) in record {
                let entry = fields.entry(key.as_str()).or_default();
                entry.present += 1;
                if is_empty(value) {
                    entry.empty += 1;
                }
            }
        }

        println!("{} ({} records)", path.display(), records.len());
        for (field, coverage) in &fields {
            println!(
                "  - {}: present {}/{}, empty {}",
                field,
                coverage.present,
                records.len(),
                coverage.empty
            );
        }
        println!();
    }

    if failed == args.files.len() {
        anyhow::bail!("None of the {} files could be read", failed);
    }
    Ok(())
}
