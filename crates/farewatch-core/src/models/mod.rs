//! Data models for the farewatch backend.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserProfile`: The authenticated user
//! - `Flight`, `FlightSearchRequest`: Flight search and results
//! - `Alert`, `AlertCreate`, `AlertUpdate`: Durable price alerts kept by the backend
//! - `SearchHistory`: Past searches
//! - `PricePrediction`: Price trend estimate for a route

pub mod alert;
pub mod flight;
pub mod history;
pub mod user;

pub use alert::{parse_price_input, Alert, AlertCreate, AlertSummary, AlertTestResult, AlertUpdate};
pub use flight::{
    mask_date_input, parse_input_date, Flight, FlightSearchRequest, FlightSearchResponse, InputError,
    PricePrediction, PricePredictionRequest, PriceTrend,
};
pub use history::SearchHistory;
pub use user::UserProfile;
