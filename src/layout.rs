use crate::errors::{PipelineError, ResultExt};
use std::path::{Path, PathBuf};

const RUN_PREFIX: &str = "run_";

/// Directory convention for a run: `<root>/raw`, `<root>/processed`,
/// `<root>/reports`.
///
/// In numbered mode processed data and reports go into a fresh `run_NNN`
/// subfolder so repeated runs never overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub raw: PathBuf,
    pub processed: PathBuf,
    pub reports: PathBuf,
}

impl OutputLayout {
    /// Plain layout under `root`; nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            raw: root.join("raw"),
            processed: root.join("processed"),
            reports: root.join("reports"),
            root,
        }
    }

    /// Layout whose processed/reports folders are the next free `run_NNN`.
    pub fn numbered(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let base = Self::new(root);
        let next = next_run_number(&base.processed)?.max(next_run_number(&base.reports)?);
        let run = format!("{}{:03}", RUN_PREFIX, next);
        Ok(Self {
            processed: base.processed.join(&run),
            reports: base.reports.join(&run),
            ..base
        })
    }

    /// Creates every directory of the layout.
    pub fn ensure(&self) -> Result<(), PipelineError> {
        for dir in [&self.raw, &self.processed, &self.reports] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}

/// One past the highest existing `run_NNN` under `dir` (1 when none).
fn next_run_number(dir: &Path) -> Result<u32, PipelineError> {
    if !dir.exists() {
        return Ok(1);
    }
    let highest = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix(RUN_PREFIX))
                .and_then(|n| n.parse::<u32>().ok())
        })
        .max()
        .unwrap_or(0);
    Ok(highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_layout() {
        let layout = OutputLayout::new("data_output");
        assert_eq!(layout.raw, PathBuf::from("data_output/raw"));
        assert_eq!(layout.processed, PathBuf::from("data_output/processed"));
        assert_eq!(layout.reports, PathBuf::from("data_output/reports"));
    }

    #[test]
    fn test_numbered_runs_increment() {
        let dir = tempfile::tempdir().unwrap();
        let first = OutputLayout::numbered(dir.path()).unwrap();
        assert!(first.processed.ends_with("processed/run_001"));
        first.ensure().unwrap();

        let second = OutputLayout::numbered(dir.path()).unwrap();
        assert!(second.processed.ends_with("processed/run_002"));
        assert!(second.reports.ends_with("reports/run_002"));
    }

    #[test]
    fn test_numbering_skips_past_gaps_and_noise() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("reports/run_007")).unwrap();
        std::fs::create_dir_all(dir.path().join("reports/run_abc")).unwrap();
        std::fs::create_dir_all(dir.path().join("processed/run_002")).unwrap();
        let layout = OutputLayout::numbered(dir.path()).unwrap();
        assert!(layout.processed.ends_with("run_008"));
    }
}
