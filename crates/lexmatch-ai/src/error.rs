use lexmatch_core::{SchemaError, SourceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training dataset is empty")]
    EmptyDataset,

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("classifier error: {0}")]
    Classifier(String),
}

/// Errors surfaced by [`RecommendationService`](crate::RecommendationService).
#[derive(Debug, Error)]
pub enum RecommendError {
    /// The historical case source could not be read while building a dataset.
    #[error("historical case data unavailable: {0}")]
    Data(#[source] SourceError),

    #[error("training failed: {0}")]
    Training(#[from] TrainingError),

    #[error("model not trained, train first")]
    NotReady,

    #[error("lawyer directory unavailable: {0}")]
    Directory(#[source] SourceError),

    #[error("cannot score lawyer {lawyer_id}: {source}")]
    Candidate {
        lawyer_id: i64,
        #[source]
        source: SchemaError,
    },
}
