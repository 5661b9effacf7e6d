//! Read seams to the case-management and lawyer-directory layers.

use thiserror::Error;

use crate::case::CaseRecord;
use crate::lawyer::LawyerRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Historical case outcomes.
pub trait CaseHistory: Send + Sync {
    /// Completed cases paired with the lawyer who was assigned to them.
    fn find_closed_cases_with_assigned_lawyer(
        &self,
    ) -> Result<Vec<(CaseRecord, LawyerRecord)>, SourceError>;
}

/// The pool of lawyers that can be recommended.
///
/// Implementations return every lawyer; verification filtering happens
/// during scoring.
pub trait LawyerDirectory: Send + Sync {
    fn find_all_lawyers(&self) -> Result<Vec<LawyerRecord>, SourceError>;
}
