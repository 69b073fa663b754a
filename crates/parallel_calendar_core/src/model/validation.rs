use chrono::{DateTime, Utc};
use thiserror::Error;

/// Structural validation failures. Always recoverable by correcting input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Task title is empty.
    #[error("task title is required")]
    TitleRequired,
    /// Window does not have a strictly positive duration.
    #[error("invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// User display name is empty or whitespace-only.
    #[error("user name is required")]
    NameRequired,
    /// Contact address is not shaped like `local@domain`.
    #[error("invalid email address `{0}`")]
    InvalidEmail(String),
    /// Allocation label outside the supported vocabulary.
    #[error("unknown allocation `{0}`; expected focused|flexible|blocked")]
    UnknownAllocation(String),
}
