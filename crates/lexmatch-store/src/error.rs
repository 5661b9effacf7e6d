use lexmatch_core::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("no results for query")]
    NoResults,

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("null {column} at row {row}")]
    NullValue { column: &'static str, row: usize },

    #[error("invalid {column} value '{value}'")]
    InvalidValue { column: &'static str, value: String },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for SourceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingColumn(_)
            | StoreError::NullValue { .. }
            | StoreError::InvalidValue { .. } => {
                SourceError::Malformed(err.to_string())
            }
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}
