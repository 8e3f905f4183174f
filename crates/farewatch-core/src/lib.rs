//! farewatch core - session, authenticated API client and price alert trigger.
//!
//! The pieces fit together like this:
//!
//! - `auth::SessionManager` restores the stored session at start, and on
//!   login, register and logout keeps the `auth::SecureStore` and the
//!   `api::ApiClient` bearer token in step with the in-memory session.
//! - `api::ApiClient` talks to the backend (search, alerts, history).
//! - `alerts::PriceAlertTrigger` checks each search result set against the
//!   user's price and fires a notification through `notifications::Notifier`.

pub mod alerts;
pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notifications;
pub mod utils;

pub use alerts::{AlertThreshold, PriceAlertTrigger};
pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionManager, SessionState};
pub use config::Config;
pub use notifications::Notifier;
