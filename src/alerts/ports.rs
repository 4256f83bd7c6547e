//! Ports consumed by the alert service
//!
//! Storage and delivery are injected as trait objects at composition time.

use async_trait::async_trait;

use crate::domain::{Alert, AlertId, DomainError};

/// Persists and retrieves `Alert` aggregates
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Insert or replace the alert
    async fn save(&self, alert: &Alert) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError>;

    /// All stored alerts, most recently created first
    async fn find_all(&self) -> Result<Vec<Alert>, RepositoryError>;

    /// Number of alerts that have never been read
    async fn count_unread(&self) -> Result<u64, RepositoryError>;

    /// Remove one alert. Removing an unknown id is not an error.
    async fn delete_one(&self, id: &AlertId) -> Result<(), RepositoryError>;

    async fn delete_all(&self) -> Result<(), RepositoryError>;
}

/// Delivers an alert to whatever transport backs it
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), SendError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data integrity error: alert {id} {reason}")]
    Integrity { id: String, reason: String },

    #[error("Stored alert is invalid: {0}")]
    InvalidRecord(#[from] DomainError),
}

/// Delivery errors reported by an `AlertSender`
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("{0}")]
    Delivery(String),
}
