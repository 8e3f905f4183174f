use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::flight::InputError;

/// A durable price alert stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    pub origin: String,
    pub destination: String,
    pub target_price: f64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub last_notified: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCreate {
    pub origin: String,
    pub destination: String,
    pub target_price: f64,
}

impl AlertCreate {
    /// Validate raw form input for a new alert.
    pub fn from_input(origin: &str, destination: &str, target_price: &str) -> Result<Self, InputError> {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() {
            return Err(InputError::MissingField("origin"));
        }
        if destination.is_empty() {
            return Err(InputError::MissingField("destination"));
        }
        let target_price = parse_price_input(target_price)
            .ok_or_else(|| InputError::InvalidPrice(target_price.trim().to_string()))?;

        Ok(Self {
            origin: origin.to_ascii_uppercase(),
            destination: destination.to_ascii_uppercase(),
            target_price,
        })
    }
}

/// Partial update for `PUT /users/me/alerts/{id}`. Unset fields are left out of the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTestResult {
    pub message: String,
    pub alert: AlertSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub origin: String,
    pub destination: String,
    pub target_price: f64,
}

/// Parse a user-typed price. Accepts a comma as decimal separator.
/// Returns `None` unless the result is a finite, strictly positive number.
pub fn parse_price_input(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_input() {
        assert_eq!(parse_price_input("300"), Some(300.0));
        assert_eq!(parse_price_input(" 299,90 "), Some(299.9));
        assert_eq!(parse_price_input("0"), None);
        assert_eq!(parse_price_input("-10"), None);
        assert_eq!(parse_price_input("abc"), None);
        assert_eq!(parse_price_input(""), None);
        assert_eq!(parse_price_input("NaN"), None);
        assert_eq!(parse_price_input("inf"), None);
    }

    #[test]
    fn test_alert_create_from_input() {
        let alert = AlertCreate::from_input("gru", "rec", "450,5").expect("valid alert");
        assert_eq!(alert.origin, "GRU");
        assert_eq!(alert.destination, "REC");
        assert_eq!(alert.target_price, 450.5);

        assert_eq!(
            AlertCreate::from_input("GRU", "REC", "0"),
            Err(InputError::InvalidPrice("0".to_string()))
        );
        assert_eq!(
            AlertCreate::from_input("GRU", " ", "10"),
            Err(InputError::MissingField("destination"))
        );
    }

    #[test]
    fn test_alert_parses_naive_timestamps() {
        let json = r#"{"id":3,"user_id":7,"origin":"GRU","destination":"SDU","target_price":300.0,"is_active":true,"created_at":"2025-01-10T14:03:22.517000","last_notified":null}"#;
        let alert: Alert = serde_json::from_str(json).expect("parse alert");
        assert_eq!(alert.id, 3);
        assert!(alert.last_notified.is_none());
        assert_eq!(alert.created_at.format("%Y-%m-%d").to_string(), "2025-01-10");
    }

    #[test]
    fn test_alert_update_skips_unset_fields() {
        let update = AlertUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"is_active":false}"#);
    }
}
