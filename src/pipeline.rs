//! The batch pipeline: load → validate → clean → dedupe → export → report.
//!
//! Each stage is a plain function over an owned batch; this module only wires
//! them together, decides file names and collects the run report.

use crate::core::cleaning::{average_quality, clean_data};
use crate::core::dedup::{concat, deduplicate, DedupStats};
use crate::core::errors::{PipelineError, ResultExt};
use crate::core::models::CleanRecord;
use crate::core::validation::{validate_data, ValidationReport, ValidationRules};
use crate::diagnostics::Diagnostics;
use crate::export::{export_data, ExportFormat, ExportSummary, TIMESTAMP_FORMAT};
use crate::layout::OutputLayout;
use crate::loader::{load_many, LoadFailure, LoadOutcome};
use crate::reports::ReportGenerator;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Everything a run needs besides its inputs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub layout: OutputLayout,
    pub formats: Vec<ExportFormat>,
    pub rules: ValidationRules,
}

impl PipelineSettings {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            formats: ExportFormat::ALL.to_vec(),
            rules: ValidationRules::default(),
        }
    }
}

/// Summary of one `process` run, also written next to the exports.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    pub run_id: Uuid,
    pub processing_timestamp: String,
    pub input_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub original_records: usize,
    pub valid_records: usize,
    pub processed_records: usize,
    pub validation_rate: f64,
    pub data_quality_avg: Option<f64>,
    pub deduplication: DedupStats,
    /// Combined validation report; messages are prefixed with the file name.
    pub validation_report: ValidationReport,
    /// Per-file validation reports, keyed by input path.
    pub file_reports: BTreeMap<String, ValidationReport>,
    pub load_failures: Vec<LoadFailure>,
    pub exported_files: ExportSummary,
    pub report_file: PathBuf,
}

impl ProcessingReport {
    pub fn exported_path(&self, format: ExportFormat) -> Option<&Path> {
        self.exported_files.path(format)
    }
}

/// Summary of one `analyze` run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub run_id: Uuid,
    pub pipeline_timestamp: String,
    pub input_files: Vec<PathBuf>,
    pub output_directory: PathBuf,
    pub total_records_loaded: usize,
    pub total_records_processed: usize,
    pub duplicates_removed: usize,
    pub load_failures: Vec<LoadFailure>,
    pub generated_files: BTreeMap<String, PathBuf>,
}

/// Both halves of a `pipeline` run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub processing: ProcessingReport,
    pub analysis: AnalysisOutcome,
}

/// Output file stem for a set of inputs.
///
/// `<input-stem>_processed` for a single file, `combined_processed` otherwise.
pub fn output_stem(inputs: &[PathBuf]) -> String {
    match inputs {
        [single] => {
            let stem = single
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "data".to_string());
            format!("{}_processed", stem)
        }
        _ => "combined_processed".to_string(),
    }
}

fn record_load_failures(outcome: &LoadOutcome, diagnostics: &mut Diagnostics) {
    for failure in &outcome.failures {
        diagnostics.warning(format!(
            "Skipped {}: {}",
            failure.path.display(),
            failure.reason
        ));
    }
}

/// Loads, validates and cleans every input, then deduplicates across all of
/// them. Fails with `NoData` when nothing loads or nothing is valid.
fn prepare(
    inputs: &[PathBuf],
    rules: &ValidationRules,
    diagnostics: &mut Diagnostics,
) -> Result<Prepared, PipelineError> {
    let loaded = load_many(inputs);
    record_load_failures(&loaded, diagnostics);

    if loaded.total_records() == 0 {
        let msg = "No data loaded from input files";
        diagnostics.error(msg);
        return Err(PipelineError::NoData(msg.to_string()));
    }

    let mut combined = ValidationReport::default();
    let mut file_reports = BTreeMap::new();
    let mut tables: Vec<Vec<CleanRecord>> = Vec::new();
    for batch in &loaded.batches {
        let (valid, report) = validate_data(&batch.records, rules);
        let label = batch.path.display().to_string();
        combined.merge(&report, &label);
        file_reports.insert(label, report);
        tables.push(clean_data(valid));
    }

    let cleaned = concat(tables);
    if cleaned.is_empty() {
        let msg = format!(
            "No valid records: all {} loaded records failed validation",
            loaded.total_records()
        );
        diagnostics.error(msg.clone());
        return Err(PipelineError::NoData(msg));
    }

    let deduped = deduplicate(cleaned);
    Ok(Prepared {
        loaded_records: loaded.total_records(),
        failures: loaded.failures,
        validation: combined,
        file_reports,
        dedup: deduped.stats(),
        records: deduped.records,
    })
}

struct Prepared {
    loaded_records: usize,
    failures: Vec<LoadFailure>,
    validation: ValidationReport,
    file_reports: BTreeMap<String, ValidationReport>,
    dedup: DedupStats,
    records: Vec<CleanRecord>,
}

/// Processes raw scraper files into cleaned, deduplicated exports.
///
/// # Arguments
/// * `inputs` - raw JSON files (already expanded)
/// * `settings` - output layout, formats and validation rules
/// * `diagnostics` - collects skipped files and fatal errors
pub fn process_files(
    inputs: &[PathBuf],
    settings: &PipelineSettings,
    diagnostics: &mut Diagnostics,
) -> Result<ProcessingReport, PipelineError> {
    tracing::info!("Processing {} input files", inputs.len());
    let prepared = prepare(inputs, &settings.rules, diagnostics)?;

    let output_dir = settings.layout.processed.clone();
    let stem = output_dir.join(output_stem(inputs));
    let exported_files = export_data(&prepared.records, &stem, &settings.formats);
    for (format, reason) in &exported_files.failures {
        diagnostics.warning(format!("Export to {} failed: {}", format, reason));
    }
    if exported_files.files.is_empty() {
        let msg = "Every requested export format failed".to_string();
        diagnostics.error(msg.clone());
        return Err(PipelineError::Export(msg));
    }

    let report_file = output_dir.join(format!(
        "processing_report_{}.json",
        Local::now().format(TIMESTAMP_FORMAT)
    ));
    let report = ProcessingReport {
        run_id: diagnostics.run_id,
        processing_timestamp: Local::now().to_rfc3339(),
        input_files: inputs.to_vec(),
        output_dir,
        original_records: prepared.loaded_records,
        valid_records: prepared.validation.valid_records,
        processed_records: prepared.records.len(),
        validation_rate: prepared.validation.validation_rate,
        data_quality_avg: average_quality(&prepared.records),
        deduplication: prepared.dedup,
        validation_report: prepared.validation,
        file_reports: prepared.file_reports,
        load_failures: prepared.failures,
        exported_files,
        report_file,
    };

    let body = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report.report_file, body)
        .with_context(|| format!("writing {}", report.report_file.display()))?;

    tracing::info!(
        "✓ Processed {} of {} records ({} duplicates removed)",
        report.processed_records,
        report.original_records,
        report.deduplication.removed
    );
    Ok(report)
}

/// Runs the statistical and trend analysis over processed (or raw) files.
///
/// Inputs go through validation and cleaning again, which leaves already
/// processed records unchanged.
pub fn analyze_files(
    inputs: &[PathBuf],
    reports_dir: &Path,
    rules: &ValidationRules,
    diagnostics: &mut Diagnostics,
) -> Result<AnalysisOutcome, PipelineError> {
    tracing::info!("Starting analysis pipeline for {} files", inputs.len());
    let prepared = prepare(inputs, rules, diagnostics)?;

    let generated_files =
        ReportGenerator::new(&prepared.records, reports_dir).generate_complete_report()?;

    Ok(AnalysisOutcome {
        run_id: diagnostics.run_id,
        pipeline_timestamp: Local::now().to_rfc3339(),
        input_files: inputs.to_vec(),
        output_directory: reports_dir.to_path_buf(),
        total_records_loaded: prepared.loaded_records,
        total_records_processed: prepared.records.len(),
        duplicates_removed: prepared.dedup.removed,
        load_failures: prepared.failures,
        generated_files,
    })
}

/// `process` followed by `analyze` on the processed JSON export.
pub fn run_pipeline(
    inputs: &[PathBuf],
    settings: &PipelineSettings,
    diagnostics: &mut Diagnostics,
) -> Result<PipelineOutcome, PipelineError> {
    let mut settings = settings.clone();
    if !settings.formats.contains(&ExportFormat::Json) {
        tracing::info!("Adding json export; the analysis step reads it");
        settings.formats.push(ExportFormat::Json);
    }

    let processing = process_files(inputs, &settings, diagnostics)?;
    let processed = processing
        .exported_path(ExportFormat::Json)
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            PipelineError::Export("processed JSON export was not written".to_string())
        })?;

    let analysis = analyze_files(
        &[processed],
        &settings.layout.reports,
        &settings.rules,
        diagnostics,
    )?;
    Ok(PipelineOutcome {
        processing,
        analysis,
    })
}
