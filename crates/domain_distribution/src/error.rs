//! Distribution domain errors

use thiserror::Error;

/// Errors that can occur in the distribution domain
#[derive(Debug, Error)]
pub enum DistributionError {
    /// Distribution code not found
    #[error("Distribution code not found: {0}")]
    CodeNotFound(String),

    /// Coding segment failed validation
    #[error("Invalid GL segment {segment}: {message}")]
    InvalidSegment { segment: String, message: String },

    /// No distribution code effective on the given date
    #[error("Distribution code {0} is not effective on {1}")]
    NotEffective(String, chrono::NaiveDate),

    /// Line item carries no distribution code
    #[error("Line item {0} has no distribution code")]
    MissingCode(String),
}
