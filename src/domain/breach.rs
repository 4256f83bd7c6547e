/// Display units keyed by upper-cased utility type
const UNITS: &[(&str, &str)] = &[("WATER", "Smc"), ("ELECTRICITY", "kWh"), ("GAS", "Smc")];

/// Threshold breach details carried by an alert
#[derive(Debug, Clone, PartialEq)]
pub struct BreachDetails {
    threshold_id: String,
    threshold_name: String,
    utility_type: String,
    threshold_type: String,
    period_type: Option<String>,
    limit_value: f64,
    detected_value: f64,
}

impl BreachDetails {
    pub fn new(
        threshold_id: impl Into<String>,
        threshold_name: impl Into<String>,
        utility_type: impl Into<String>,
        threshold_type: impl Into<String>,
        period_type: Option<String>,
        limit_value: f64,
        detected_value: f64,
    ) -> Self {
        Self {
            threshold_id: threshold_id.into(),
            threshold_name: threshold_name.into(),
            utility_type: utility_type.into(),
            threshold_type: threshold_type.into(),
            period_type,
            limit_value,
            detected_value,
        }
    }

    pub fn threshold_id(&self) -> &str {
        &self.threshold_id
    }

    pub fn threshold_name(&self) -> &str {
        &self.threshold_name
    }

    pub fn utility_type(&self) -> &str {
        &self.utility_type
    }

    pub fn threshold_type(&self) -> &str {
        &self.threshold_type
    }

    pub fn period_type(&self) -> Option<&str> {
        self.period_type.as_deref()
    }

    pub fn limit_value(&self) -> f64 {
        self.limit_value
    }

    pub fn detected_value(&self) -> f64 {
        self.detected_value
    }

    /// Unit for the utility type, empty for unknown utilities
    pub fn unit(&self) -> &'static str {
        let key = self.utility_type.to_uppercase();
        UNITS
            .iter()
            .find(|(utility, _)| *utility == key)
            .map(|(_, unit)| *unit)
            .unwrap_or("")
    }

    /// Human-readable description of the breach
    pub fn formatted_message(&self) -> String {
        let unit = self.unit();
        let diff = self.detected_value - self.limit_value;

        format!(
            "The '{}' threshold was exceeded by {}{}.\nDetected: {}{}\nLimit:    {}{}",
            self.threshold_name,
            two_decimals(diff),
            unit,
            self.detected_value,
            unit,
            self.limit_value,
            unit
        )
    }
}

/// Format with two decimals, rounding exact ties away from zero.
///
/// `{:.2}` already rounds to the nearest representable decimal but breaks
/// exact ties to even. A double lies exactly halfway between two hundredths
/// only when it is an odd multiple of 1/8, which `value * 8.0` detects
/// without rounding error.
fn two_decimals(value: f64) -> String {
    let eighths = value * 8.0;
    if eighths.is_finite() && eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        format!("{:.2}", (value * 100.0).round() / 100.0)
    } else {
        format!("{:.2}", value)
    }
}
