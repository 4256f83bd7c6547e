//! Transport representation of alerts, shared by the JSON API and the stream

use serde::Serialize;

use crate::domain::time::format_iso8601;
use crate::domain::{Alert, AlertStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: String,
    pub status: AlertStatus,
    pub message: String,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub fail_reason: Option<String>,
    pub read_at: Option<String>,
    pub is_read: bool,
    pub details: AlertDetailsResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDetailsResponse {
    pub utility: String,
    pub limit: f64,
    pub detected: f64,
    pub threshold_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_type: Option<String>,
}

impl From<&Alert> for AlertResponse {
    fn from(alert: &Alert) -> Self {
        let details = alert.details();
        Self {
            id: alert.id().to_string(),
            status: alert.status(),
            message: details.formatted_message(),
            created_at: format_iso8601(&alert.created_at()),
            sent_at: alert.sent_at().as_ref().map(format_iso8601),
            fail_reason: alert.fail_reason().map(str::to_string),
            read_at: alert.read_at().as_ref().map(format_iso8601),
            is_read: alert.is_read(),
            details: AlertDetailsResponse {
                utility: details.utility_type().to_string(),
                limit: details.limit_value(),
                detected: details.detected_value(),
                threshold_name: details.threshold_name().to_string(),
                period_type: details.period_type().map(str::to_string),
            },
        }
    }
}
