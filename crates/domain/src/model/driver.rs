use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver info
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Caller profile as supplied by the telephony layer at call start.
/// The phone number is an opaque string; no format is assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverInfo {
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default = "d_language")]
    pub preferred_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_status: Option<String>,
    #[serde(default)]
    pub total_trips: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl DriverInfo {
    /// Placeholder profile for calls that arrive without caller metadata.
    pub fn unknown() -> Self {
        Self {
            phone_number: "unknown".into(),
            name: None,
            driver_id: None,
            city: None,
            preferred_language: d_language(),
            subscription_plan: None,
            account_status: None,
            total_trips: 0,
            rating: None,
        }
    }

    /// Last four digits of the phone number for dashboard display, or
    /// asterisks when the number is shorter than four characters.
    pub fn phone_last_4(&self) -> String {
        let chars: Vec<char> = self.phone_number.chars().collect();
        if chars.len() >= 4 {
            chars[chars.len() - 4..].iter().collect()
        } else {
            "****".into()
        }
    }
}

fn d_language() -> String {
    "hi-IN".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_last_4_masks_short_numbers() {
        let mut info = DriverInfo::unknown();
        info.phone_number = "+919876543210".into();
        assert_eq!(info.phone_last_4(), "3210");

        info.phone_number = "91".into();
        assert_eq!(info.phone_last_4(), "****");
    }
}
