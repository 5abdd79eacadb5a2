use crate::errors::{PipelineError, ResultExt};
use crate::export::TIMESTAMP_FORMAT;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One timestamped message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticEntry {
    pub timestamp: String,
    pub message: String,
}

/// Errors and warnings collected over a run, dumped to disk when the run
/// aborts.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub run_id: Uuid,
    pub started_at: String,
    pub errors: Vec<DiagnosticEntry>,
    pub warnings: Vec<DiagnosticEntry>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}

impl Diagnostics {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Local::now().to_rfc3339(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(run_id = %self.run_id, "{}", message);
        self.errors.push(entry(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(run_id = %self.run_id, "{}", message);
        self.warnings.push(entry(message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Writes `diagnostics_<timestamp>.json` into `dir`, creating it if needed.
    pub fn dump(&self, dir: &Path) -> Result<PathBuf, PipelineError> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        let path = dir.join(format!("diagnostics_{}.json", stamp));
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Diagnostics written to {}", path.display());
        Ok(path)
    }
}

fn entry(message: String) -> DiagnosticEntry {
    DiagnosticEntry {
        timestamp: Local::now().to_rfc3339(),
        message,
    }
}
