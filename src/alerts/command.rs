use crate::domain::BreachDetails;

/// Data required to create an alert
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAlertCommand {
    pub threshold_id: String,
    pub threshold_name: String,
    pub utility_type: String,
    pub threshold_type: String,
    pub period_type: Option<String>,
    pub limit_value: f64,
    pub detected_value: f64,
}

impl CreateAlertCommand {
    pub fn into_details(self) -> BreachDetails {
        BreachDetails::new(
            self.threshold_id,
            self.threshold_name,
            self.utility_type,
            self.threshold_type,
            self.period_type,
            self.limit_value,
            self.detected_value,
        )
    }
}
