//! REST API client module for the farewatch backend.
//!
//! This module provides the `ApiClient` for communicating with the backend
//! to search flights, manage price alerts and read search history.
//!
//! The backend uses JWT bearer token authentication. The token is pushed into
//! the client by the session manager through `set_auth_token`; the client
//! never reads the credential store itself.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi, AuthGrant};
pub use error::ApiError;
