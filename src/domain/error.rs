/// Domain validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid alert ID format '{id}': {reason}")]
    InvalidAlertId { id: String, reason: String },

    #[error("Invalid ISO-8601 DateTime format: {0}")]
    MalformedTimestamp(String),

    #[error("Invalid ISO-8601 DateTime value: {0}")]
    InvalidTimestampValue(String),

    #[error("Unknown alert status: {0}")]
    UnknownStatus(String),
}
