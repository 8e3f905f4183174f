use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format users type dates in (day first).
const INPUT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Length of an IATA airport code.
const IATA_CODE_LEN: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid IATA code '{0}' (expected 3 letters, e.g. GRU)")]
    InvalidAirport(String),

    #[error("Invalid date '{0}' (expected DD-MM-YYYY)")]
    InvalidDate(String),

    #[error("Round trip requires a return date")]
    MissingReturnDate,

    #[error("Invalid price '{0}' (expected a positive number)")]
    InvalidPrice(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub airline: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub price: f64,
    pub stops: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_round_trip: Option<bool>,
    #[serde(default)]
    pub outbound_price: Option<f64>,
    #[serde(default)]
    pub inbound_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSearchResponse {
    pub flights: Vec<Flight>,
    pub search_id: String,
}

/// Body of `POST /flights/search`. Dates go over the wire as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(default)]
    pub round_trip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
}

impl FlightSearchRequest {
    /// Build a search from raw form input.
    ///
    /// Airport codes are uppercased. Dates are typed day first
    /// (`DD-MM-YYYY`); any separator is accepted since only the digits are
    /// kept. Passing a return date makes the search a round trip.
    pub fn from_input(
        origin: &str,
        destination: &str,
        departure: &str,
        return_date: Option<&str>,
    ) -> Result<Self, InputError> {
        let origin = parse_airport(origin, "origin")?;
        let destination = parse_airport(destination, "destination")?;
        if departure.trim().is_empty() {
            return Err(InputError::MissingField("departure date"));
        }
        let departure_date = parse_input_date(departure)?;

        let return_date = match return_date {
            Some(raw) if raw.trim().is_empty() => return Err(InputError::MissingReturnDate),
            Some(raw) => Some(parse_input_date(raw)?),
            None => None,
        };

        Ok(Self {
            origin,
            destination,
            departure_date,
            round_trip: return_date.is_some(),
            return_date,
        })
    }
}

fn parse_airport(raw: &str, field: &'static str) -> Result<String, InputError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(InputError::MissingField(field));
    }
    if code.len() != IATA_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(InputError::InvalidAirport(code.to_string()));
    }
    Ok(code.to_ascii_uppercase())
}

/// Keep the first eight digits and regroup them as `DD-MM-YYYY`.
pub fn mask_date_input(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).take(8).collect();
    let mut parts = Vec::with_capacity(3);
    for (start, end) in [(0, 2), (2, 4), (4, 8)] {
        if digits.len() > start {
            parts.push(&digits[start..end.min(digits.len())]);
        }
    }
    parts.join("-")
}

/// Parse a day-first date, rejecting impossible calendar dates.
pub fn parse_input_date(raw: &str) -> Result<NaiveDate, InputError> {
    let masked = mask_date_input(raw);
    if masked.len() != 10 {
        return Err(InputError::InvalidDate(raw.trim().to_string()));
    }
    NaiveDate::parse_from_str(&masked, INPUT_DATE_FORMAT)
        .map_err(|_| InputError::InvalidDate(raw.trim().to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePredictionRequest {
    pub origin: String,
    pub destination: String,
    pub days_ahead: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Up,
    Down,
    Stable,
}

impl std::fmt::Display for PriceTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceTrend::Up => write!(f, "up"),
            PriceTrend::Down => write!(f, "down"),
            PriceTrend::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub predicted_price: f64,
    pub trend: PriceTrend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_date_input() {
        assert_eq!(mask_date_input("01022025"), "01-02-2025");
        assert_eq!(mask_date_input("01/02/2025"), "01-02-2025");
        assert_eq!(mask_date_input("0102"), "01-02");
        assert_eq!(mask_date_input("1"), "1");
        assert_eq!(mask_date_input("01-02-20251999"), "01-02-2025");
        assert_eq!(mask_date_input(""), "");
    }

    #[test]
    fn test_parse_input_date_calendar_rules() {
        assert_eq!(
            parse_input_date("29-02-2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        // Not a leap year
        assert!(parse_input_date("29-02-2025").is_err());
        assert!(parse_input_date("31-04-2025").is_err());
        assert!(parse_input_date("00-01-2025").is_err());
        assert!(parse_input_date("01-13-2025").is_err());
        assert!(parse_input_date("1-1-2025").is_err());
    }

    #[test]
    fn test_from_input_one_way() {
        let req = FlightSearchRequest::from_input(" gru", "sdu ", "15-03-2025", None)
            .expect("valid search");
        assert_eq!(req.origin, "GRU");
        assert_eq!(req.destination, "SDU");
        assert!(!req.round_trip);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["departure_date"], "2025-03-15");
        assert!(json.get("return_date").is_none());
    }

    #[test]
    fn test_from_input_round_trip() {
        let req = FlightSearchRequest::from_input("GRU", "LIS", "15-03-2025", Some("22-03-2025"))
            .expect("valid round trip");
        assert!(req.round_trip);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["return_date"], "2025-03-22");
    }

    #[test]
    fn test_from_input_rejects_bad_fields() {
        assert_eq!(
            FlightSearchRequest::from_input("", "SDU", "15-03-2025", None),
            Err(InputError::MissingField("origin"))
        );
        assert_eq!(
            FlightSearchRequest::from_input("GRUX", "SDU", "15-03-2025", None),
            Err(InputError::InvalidAirport("GRUX".to_string()))
        );
        assert_eq!(
            FlightSearchRequest::from_input("G1U", "SDU", "15-03-2025", None),
            Err(InputError::InvalidAirport("G1U".to_string()))
        );
        assert_eq!(
            FlightSearchRequest::from_input("GRU", "SDU", "", None),
            Err(InputError::MissingField("departure date"))
        );
        assert_eq!(
            FlightSearchRequest::from_input("GRU", "SDU", "15-03-2025", Some(" ")),
            Err(InputError::MissingReturnDate)
        );
    }

    #[test]
    fn test_flight_parses_backend_payload() {
        let json = r#"{"id":"f1","airline":"LATAM","flight_number":"LA3000","origin":"GRU","destination":"SDU","departure_time":"08:00","arrival_time":"09:05","duration":"1h05m","price":389.9,"stops":0}"#;
        let flight: Flight = serde_json::from_str(json).expect("parse flight");
        assert_eq!(flight.price, 389.9);
        assert_eq!(flight.url, None);
        assert_eq!(flight.is_round_trip, None);
    }

    #[test]
    fn test_price_trend_parse() {
        let p: PricePrediction =
            serde_json::from_str(r#"{"predicted_price":512.3,"trend":"down"}"#).unwrap();
        assert_eq!(p.trend, PriceTrend::Down);
        assert_eq!(p.trend.to_string(), "down");
    }
}
