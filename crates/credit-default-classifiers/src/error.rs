use thiserror::Error;

/// Errors raised by the cleaning, pipeline, search and persistence stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A column required by the canonical schema is absent.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// Columns presented at predict time differ from the ones seen at fit time.
    #[error("schema mismatch: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A row still carries a missing value where a complete record is required.
    #[error("missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("row count mismatch: {x_rows} feature rows but {y_len} labels")]
    LengthMismatch { x_rows: usize, y_len: usize },

    #[error("cannot fit {0} on an empty matrix")]
    EmptyInput(&'static str),

    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("unknown hyperparameter '{0}'")]
    UnknownParam(String),

    #[error("invalid value for '{path}': {reason}")]
    InvalidParam { path: String, reason: String },

    #[error("invalid cross-validation setup: {0}")]
    CrossValidation(String),

    #[error("unknown scoring criterion '{0}'")]
    UnknownScoring(String),

    #[error("model serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
