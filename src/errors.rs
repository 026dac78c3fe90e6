// Error types
// One variant per failure the pipeline can surface; callers match on these

use std::path::PathBuf;

/// Errors raised by the address resolver, dataset store, model contract,
/// orchestrator and evaluation engine.
#[derive(thiserror::Error, Debug)]
pub enum AnalyticsError {
    /// Datatype key not in the address table.
    #[error("Invalid datatype: {0}. Supported datatypes are raw, train, dev, test, traindev, models, predictions")]
    UnknownDatatype(String),

    /// Declared model type other than `rules` or `ml`.
    #[error("Invalid model type: {0}. Supported types are 'rules' and 'ml'")]
    UnknownModelType(String),

    /// Category key or description outside the fixed taxonomy.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Implementation name with no registry entry.
    #[error("No model implementation registered under '{0}'")]
    UnknownModel(String),

    /// Export records lacking columns the pipeline depends on.
    #[error("Columns not found in records: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// Interactive or indexed selection past the end of the option list.
    #[error("Invalid selection {index}. Please choose one of the available options, [0..{available})")]
    SelectionOutOfRange { index: usize, available: usize },

    /// Coordinate lacks a field its datatype needs to resolve.
    #[error("Coordinate for '{datatype}' requires field '{field}'")]
    MissingCoordinateField {
        datatype: &'static str,
        field: &'static str,
    },

    /// Coordinate carries a field its datatype is not keyed by.
    #[error("Coordinate for '{datatype}' cannot carry field '{field}'")]
    UnexpectedCoordinateField {
        datatype: &'static str,
        field: &'static str,
    },

    /// Project or implementation name that collides with the path scheme.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Path that the resolver did not produce.
    #[error("Cannot parse location {path}: {reason}")]
    InvalidLocation { path: PathBuf, reason: String },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Keyword trigger that is not a valid regular expression.
    #[error("Invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Prediction requested from an instance that never trained.
    #[error("Model not trained for {category} ({model_name}). Call train() first")]
    NotTrained {
        category: String,
        model_name: String,
    },

    /// Operation not offered by the active model kind.
    #[error("'{operation}' is not supported for {kind} models")]
    Unsupported {
        operation: &'static str,
        kind: &'static str,
    },

    /// Coordinate with no backing file.
    #[error("No data found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Well-formed file whose contents break an invariant.
    #[error("Malformed data in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Training input the estimator cannot fit.
    #[error("Training failed: {0}")]
    Training(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Convenience alias for `std::result::Result<T, AnalyticsError>`.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl AnalyticsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// True for failures caused by setup rather than by data or model state.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownDatatype(_)
                | Self::UnknownModelType(_)
                | Self::UnknownCategory(_)
                | Self::UnknownModel(_)
                | Self::MissingColumns { .. }
                | Self::SelectionOutOfRange { .. }
                | Self::MissingCoordinateField { .. }
                | Self::UnexpectedCoordinateField { .. }
                | Self::InvalidName { .. }
                | Self::Config(_)
                | Self::Pattern(_)
        )
    }
}
