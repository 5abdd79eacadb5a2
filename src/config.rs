use crate::export::ExportFormat;
use crate::validation::ValidationRules;
use std::path::PathBuf;

/// Runtime configuration, read from the environment (and `.env`).
///
/// Every value has a default, so an empty environment is a valid setup.
/// Command-line flags override what is loaded here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the `raw/`, `processed/` and `reports/` tree.
    pub output_root: PathBuf,
    /// Formats written by `process` when `--formats` is not given.
    pub formats: Vec<ExportFormat>,
    /// Write each run into a fresh `run_NNN` folder.
    pub numbered_runs: bool,
    /// Optional JSON file overriding the default validation rules.
    pub rules_file: Option<PathBuf>,
    /// Optional log file, written in addition to stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("data_output"),
            formats: ExportFormat::ALL.to_vec(),
            numbered_runs: false,
            rules_file: None,
            log_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            output_root: match lookup("PIPELINE_OUTPUT_ROOT") {
                Some(root) => {
                    if root.trim().is_empty() {
                        anyhow::bail!("PIPELINE_OUTPUT_ROOT cannot be empty");
                    }
                    PathBuf::from(root.trim())
                }
                None => defaults.output_root,
            },
            formats: match lookup("PIPELINE_FORMATS") {
                Some(list) => parse_format_list(&list)?,
                None => defaults.formats,
            },
            numbered_runs: match lookup("PIPELINE_NUMBERED_RUNS") {
                Some(flag) => parse_flag(&flag).ok_or_else(|| {
                    anyhow::anyhow!("PIPELINE_NUMBERED_RUNS must be true/false (got '{}')", flag)
                })?,
                None => defaults.numbered_runs,
            },
            rules_file: lookup("PIPELINE_RULES_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            log_file: lookup("PIPELINE_LOG_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        tracing::debug!("Output root: {}", config.output_root.display());
        tracing::debug!("Default formats: {:?}", config.formats);
        if let Some(ref rules) = config.rules_file {
            tracing::debug!("Validation rules file: {}", rules.display());
        }

        Ok(config)
    }

    /// Validation rules from `rules_file`, or the built-in defaults.
    pub fn load_rules(&self) -> anyhow::Result<ValidationRules> {
        match self.rules_file {
            Some(ref path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read rules file {}: {}", path.display(), e)
                })?;
                let rules: ValidationRules = serde_json::from_str(&text).map_err(|e| {
                    anyhow::anyhow!("Invalid rules file {}: {}", path.display(), e)
                })?;
                rules.check().map_err(|e| anyhow::anyhow!("{}", e))?;
                tracing::info!("Loaded validation rules from {}", path.display());
                Ok(rules)
            }
            None => Ok(ValidationRules::default()),
        }
    }
}

fn parse_format_list(list: &str) -> anyhow::Result<Vec<ExportFormat>> {
    let mut formats = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let format = ExportFormat::parse(item)
            .ok_or_else(|| anyhow::anyhow!("Unknown export format in PIPELINE_FORMATS: {}", item))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        anyhow::bail!("PIPELINE_FORMATS cannot be empty");
    }
    Ok(formats)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
