use std::fmt;

/// Pipeline error types.
///
/// Per-record validation problems are never represented here; they are
/// accumulated in the validation report instead.
#[derive(Debug)]
pub enum PipelineError {
    /// Filesystem errors (missing input, unwritable output directory).
    Io(std::io::Error),
    /// Malformed JSON input or failed JSON serialization.
    Json(serde_json::Error),
    /// CSV writer failure.
    Csv(csv::Error),
    /// Spreadsheet writer failure.
    Spreadsheet(String),
    /// Input that is readable but unusable (empty file, wrong shape).
    InvalidInput(String),
    /// Nothing left to process: no file loaded or no record survived validation.
    NoData(String),
    /// Export of a single format failed.
    Export(String),
    /// Invalid configuration value.
    Config(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<PipelineError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::Json(e) => write!(f, "JSON error: {}", e),
            PipelineError::Csv(e) => write!(f, "CSV error: {}", e),
            PipelineError::Spreadsheet(msg) => write!(f, "Spreadsheet error: {}", msg),
            PipelineError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            PipelineError::NoData(msg) => write!(f, "No data: {}", msg),
            PipelineError::Export(msg) => write!(f, "Export error: {}", msg),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(e) => Some(e),
            PipelineError::Json(e) => Some(e),
            PipelineError::Csv(e) => Some(e),
            PipelineError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl PipelineError {
    /// True when the run has nothing left to process and must abort.
    pub fn is_no_data(&self) -> bool {
        match self {
            PipelineError::NoData(_) => true,
            PipelineError::WithContext { source, .. } => source.is_no_data(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Json(err)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Csv(err)
    }
}

impl From<rust_xlsxwriter::XlsxError> for PipelineError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        PipelineError::Spreadsheet(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `PipelineError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<PipelineError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(e.into()),
            context: f(),
        })
    }
}
