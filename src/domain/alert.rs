//! The `Alert` aggregate
//!
//! An alert is created `PENDING` and then moved by exactly two kinds of
//! transition:
//!
//! - delivery outcome: [`Alert::mark_as_sent`] is guarded and idempotent,
//!   [`Alert::mark_as_failed`] always overwrites (last attempt wins);
//! - read state: [`Alert::mark_as_read`] records only the first read.
//!
//! There is no way back to `PENDING`.

use chrono::{DateTime, Utc};

use super::alert_id::AlertId;
use super::breach::BreachDetails;
use super::error::DomainError;
use super::status::AlertStatus;
use super::time::parse_iso8601;

/// A timestamp handed to [`Alert::restore`], either already parsed or as
/// ISO-8601 text still to be validated
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    Parsed(DateTime<Utc>),
    Text(String),
}

impl TimestampInput {
    fn resolve(self) -> Result<DateTime<Utc>, DomainError> {
        match self {
            TimestampInput::Parsed(dt) => Ok(dt),
            TimestampInput::Text(text) => parse_iso8601(&text),
        }
    }
}

impl From<DateTime<Utc>> for TimestampInput {
    fn from(dt: DateTime<Utc>) -> Self {
        TimestampInput::Parsed(dt)
    }
}

impl From<&str> for TimestampInput {
    fn from(text: &str) -> Self {
        TimestampInput::Text(text.to_string())
    }
}

impl From<String> for TimestampInput {
    fn from(text: String) -> Self {
        TimestampInput::Text(text)
    }
}

/// Alert aggregate root
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    id: AlertId,
    details: BreachDetails,
    created_at: DateTime<Utc>,
    status: AlertStatus,
    sent_at: Option<DateTime<Utc>>,
    fail_reason: Option<String>,
    read_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a fresh pending alert stamped with the current time
    pub fn create(details: BreachDetails) -> Self {
        Self {
            id: AlertId::generate(),
            details,
            created_at: Utc::now(),
            status: AlertStatus::Pending,
            sent_at: None,
            fail_reason: None,
            read_at: None,
        }
    }

    /// Rebuild an alert from previously stored state.
    ///
    /// Text timestamps are validated as ISO-8601. Text without the ISO-8601
    /// shape is rejected with [`DomainError::MalformedTimestamp`]; well-shaped
    /// text naming no real instant (month 13, Feb 30) is rejected with
    /// [`DomainError::InvalidTimestampValue`].
    pub fn restore(
        id: AlertId,
        details: BreachDetails,
        created_at: impl Into<TimestampInput>,
        status: AlertStatus,
        sent_at: Option<TimestampInput>,
        fail_reason: Option<String>,
        read_at: Option<TimestampInput>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            details,
            created_at: created_at.into().resolve()?,
            status,
            sent_at: sent_at.map(TimestampInput::resolve).transpose()?,
            fail_reason,
            read_at: read_at.map(TimestampInput::resolve).transpose()?,
        })
    }

    /// Record a successful delivery. No-op once the alert is already `SENT`.
    pub fn mark_as_sent(&mut self) {
        if self.status == AlertStatus::Sent {
            return;
        }
        self.status = AlertStatus::Sent;
        self.sent_at = Some(Utc::now());
    }

    /// Record a failed delivery, overwriting whatever outcome came before
    pub fn mark_as_failed(&mut self, reason: impl Into<String>) {
        self.status = AlertStatus::Failed;
        self.fail_reason = Some(reason.into());
    }

    /// Record that an operator has read the alert. Only the first call counts.
    pub fn mark_as_read(&mut self) {
        if self.read_at.is_some() {
            return;
        }
        self.read_at = Some(Utc::now());
    }

    pub fn id(&self) -> &AlertId {
        &self.id
    }

    pub fn details(&self) -> &BreachDetails {
        &self.details
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn fail_reason(&self) -> Option<&str> {
        self.fail_reason.as_deref()
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}
