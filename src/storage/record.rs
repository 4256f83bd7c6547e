//! Persisted shape of an alert

use serde::{Deserialize, Serialize};

use crate::alerts::RepositoryError;
use crate::domain::time::format_iso8601;
use crate::domain::{Alert, AlertId, BreachDetails};

/// Alert as written to storage. Timestamps are ISO-8601 text and are
/// re-validated by `Alert::restore` on the way back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub details: Option<BreachRecord>,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub sent_at: Option<String>,
    #[serde(default)]
    pub fail_reason: Option<String>,
    #[serde(default)]
    pub read_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreachRecord {
    pub threshold_id: String,
    pub threshold_name: String,
    pub utility_type: String,
    pub threshold_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_type: Option<String>,
    pub limit_value: f64,
    pub detected_value: f64,
}

impl AlertRecord {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl From<&Alert> for AlertRecord {
    fn from(alert: &Alert) -> Self {
        let details = alert.details();
        Self {
            id: alert.id().to_string(),
            details: Some(BreachRecord {
                threshold_id: details.threshold_id().to_string(),
                threshold_name: details.threshold_name().to_string(),
                utility_type: details.utility_type().to_string(),
                threshold_type: details.threshold_type().to_string(),
                period_type: details.period_type().map(str::to_string),
                limit_value: details.limit_value(),
                detected_value: details.detected_value(),
            }),
            status: alert.status().to_string(),
            created_at: format_iso8601(&alert.created_at()),
            sent_at: alert.sent_at().as_ref().map(format_iso8601),
            fail_reason: alert.fail_reason().map(str::to_string),
            read_at: alert.read_at().as_ref().map(format_iso8601),
        }
    }
}

impl TryFrom<AlertRecord> for Alert {
    type Error = RepositoryError;

    fn try_from(record: AlertRecord) -> Result<Self, Self::Error> {
        let details = record.details.ok_or_else(|| RepositoryError::Integrity {
            id: record.id.clone(),
            reason: "is missing details".to_string(),
        })?;

        let details = BreachDetails::new(
            details.threshold_id,
            details.threshold_name,
            details.utility_type,
            details.threshold_type,
            details.period_type,
            details.limit_value,
            details.detected_value,
        );

        Ok(Alert::restore(
            AlertId::parse(&record.id)?,
            details,
            record.created_at,
            record.status.parse()?,
            record.sent_at.map(Into::into),
            record.fail_reason,
            record.read_at.map(Into::into),
        )?)
    }
}
