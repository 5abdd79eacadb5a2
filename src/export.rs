use crate::errors::{PipelineError, ResultExt};
use crate::models::{columns, Cell, CleanRecord};
use chrono::Local;
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Timestamp appended to every exported file name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Excel,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Excel];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }

    /// Parses a format name; `xlsx` and `spreadsheet` are accepted for Excel.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "excel" | "xlsx" | "spreadsheet" => Some(ExportFormat::Excel),
            _ => None,
        }
    }

    fn writer(&self) -> &'static dyn TableWriter {
        match self {
            ExportFormat::Json => &JsonWriter,
            ExportFormat::Csv => &CsvWriter,
            ExportFormat::Excel => &SpreadsheetWriter,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
        })
    }
}

/// Writes a whole table to one file.
trait TableWriter {
    fn write(&self, records: &[CleanRecord], path: &Path) -> Result<(), PipelineError>;
}

struct JsonWriter;
struct CsvWriter;
struct SpreadsheetWriter;

impl TableWriter for JsonWriter {
    fn write(&self, records: &[CleanRecord], path: &Path) -> Result<(), PipelineError> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, records)?;
        out.flush()?;
        Ok(())
    }
}

impl TableWriter for CsvWriter {
    fn write(&self, records: &[CleanRecord], path: &Path) -> Result<(), PipelineError> {
        let columns = columns(records);
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|c| record.cell(c).render()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TableWriter for SpreadsheetWriter {
    fn write(&self, records: &[CleanRecord], path: &Path) -> Result<(), PipelineError> {
        let columns = columns(records);
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, name) in columns.iter().enumerate() {
            sheet.write_string(0, sheet_col(col)?, name.as_str())?;
        }
        for (row, record) in records.iter().enumerate() {
            let row = u32::try_from(row + 1)
                .map_err(|_| PipelineError::Spreadsheet("too many rows".into()))?;
            for (col, name) in columns.iter().enumerate() {
                match record.cell(name) {
                    Cell::Text(text) => {
                        sheet.write_string(row, sheet_col(col)?, text.as_str())?;
                    }
                    Cell::Number(n) => {
                        sheet.write_number(row, sheet_col(col)?, n)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

fn sheet_col(col: usize) -> Result<u16, PipelineError> {
    u16::try_from(col).map_err(|_| PipelineError::Spreadsheet("too many columns".into()))
}

/// One file written by the exporter, with its integrity checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub records: usize,
    /// SHA-256 of the file contents (hex encoded)
    pub sha256: String,
}

impl ExportedFile {
    /// Re-hashes the file on disk and compares against the recorded checksum.
    ///
    /// Returns false if the file is missing or was modified after export.
    pub fn verify(&self) -> bool {
        match file_checksum(&self.path) {
            Ok(current) => current == self.sha256,
            Err(e) => {
                tracing::warn!("Cannot verify {}: {}", self.path.display(), e);
                false
            }
        }
    }
}

/// SHA-256 of a file's contents, hex encoded.
pub fn file_checksum(path: &Path) -> Result<String, PipelineError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// What an export pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub files: BTreeMap<ExportFormat, ExportedFile>,
    /// Formats that failed, with the reason.
    pub failures: BTreeMap<ExportFormat, String>,
}

impl ExportSummary {
    pub fn path(&self, format: ExportFormat) -> Option<&Path> {
        self.files.get(&format).map(|f| f.path.as_path())
    }
}

/// Exports a table in every requested format, stamped with the current time.
///
/// `stem` is a path without extension (`out/processed/raw_processed`); each
/// file is written to `<stem>_<timestamp>.<ext>`. A format that fails is
/// logged and skipped without affecting the others.
pub fn export_data(records: &[CleanRecord], stem: &Path, formats: &[ExportFormat]) -> ExportSummary {
    let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    export_with_stamp(records, stem, formats, &stamp)
}

/// [`export_data`] with an explicit timestamp suffix.
pub fn export_with_stamp(
    records: &[CleanRecord],
    stem: &Path,
    formats: &[ExportFormat],
    stamp: &str,
) -> ExportSummary {
    let mut summary = ExportSummary::default();

    if let Some(parent) = stem.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Cannot create output directory {}: {}", parent.display(), e);
            for format in formats {
                summary.failures.insert(*format, e.to_string());
            }
            return summary;
        }
    }

    for format in formats {
        if summary.files.contains_key(format) {
            continue;
        }
        let path = stamped_path(stem, stamp, format.extension());
        match write_one(*format, records, &path) {
            Ok(exported) => {
                tracing::info!("Exported {} records to {}", records.len(), path.display());
                summary.files.insert(*format, exported);
            }
            Err(e) => {
                tracing::error!("Error exporting to {}: {}", format, e);
                summary.failures.insert(*format, e.to_string());
            }
        }
    }

    summary
}

fn write_one(
    format: ExportFormat,
    records: &[CleanRecord],
    path: &Path,
) -> Result<ExportedFile, PipelineError> {
    format
        .writer()
        .write(records, path)
        .with_context(|| format!("writing {}", path.display()))?;
    let sha256 = file_checksum(path).context("hashing export")?;
    Ok(ExportedFile {
        format,
        path: path.to_path_buf(),
        records: records.len(),
        sha256,
    })
}

/// `<stem>_<stamp>.<ext>`
pub fn stamped_path(stem: &Path, stamp: &str, extension: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(format!("_{}.{}", stamp, extension));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_aliases() {
        assert_eq!(ExportFormat::parse("xlsx"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse("Spreadsheet"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse(" CSV "), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("parquet"), None);
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
    }

    #[test]
    fn test_stamped_path() {
        let path = stamped_path(Path::new("out/processed/raw_processed"), "20240301_101500", "csv");
        assert_eq!(path, PathBuf::from("out/processed/raw_processed_20240301_101500.csv"));
    }

    #[test]
    fn test_checksum_detects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"[]").unwrap();
        let exported = ExportedFile {
            format: ExportFormat::Json,
            path: path.clone(),
            records: 0,
            sha256: file_checksum(&path).unwrap(),
        };
        assert!(exported.verify());

        std::fs::write(&path, b"[{}]").unwrap();
        assert!(!exported.verify());

        std::fs::remove_file(&path).unwrap();
        assert!(!exported.verify());
    }

    #[test]
    fn test_checksum_consistency() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();
        assert_eq!(file_checksum(&a).unwrap(), file_checksum(&b).unwrap());
        assert_eq!(file_checksum(&a).unwrap().len(), 64);
    }
}
