//! API client for communicating with the farewatch REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests: token exchange, registration, flight search, price alerts
//! and search history.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    Alert, AlertCreate, AlertTestResult, AlertUpdate, FlightSearchRequest, FlightSearchResponse,
    PricePrediction, PricePredictionRequest, SearchHistory, UserProfile,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const TOKEN_PATH: &str = "/auth/token";
const REGISTER_PATH: &str = "/auth/register";
const PROFILE_PATH: &str = "/users/me";
const ALERTS_PATH: &str = "/users/me/alerts";
const HISTORY_PATH: &str = "/users/me/history";
const SEARCH_PATH: &str = "/flights/search";
const PREDICT_PATH: &str = "/flights/predict";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    /// Newer backends return the profile alongside the token.
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Result of a successful token exchange: the bearer token and the profile it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub token: String,
    pub user: UserProfile,
}

/// The authentication half of the transport, as seen by the session manager.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email and password for a bearer token and profile.
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Create an account and return its bearer token and profile.
    async fn register(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Replace the bearer token attached to every subsequent request.
    fn set_auth_token(&self, token: Option<&str>);
}

/// API client for the farewatch backend.
/// Clone is cheap and clones share both the connection pool and the bearer token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a client against the configured backend
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config.base_url())
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, "API client created");

        Ok(Self {
            client,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token, if any
    pub fn auth_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.auth_token() {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Attach the bearer token, send, and reject non-2xx responses.
    async fn dispatch(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(ApiError::NetworkError)
            .with_context(|| format!("Failed to send {}", what))?;
        Self::check_response(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse {} response", what))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.get(self.url(path));
        let response = self.dispatch(request, &format!("GET {}", path)).await?;
        Self::parse(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.dispatch(request, &format!("POST {}", path)).await?;
        Self::parse(response, path).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.client.put(self.url(path)).json(body);
        let response = self.dispatch(request, &format!("PUT {}", path)).await?;
        Self::parse(response, path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = self.client.delete(self.url(path));
        self.dispatch(request, &format!("DELETE {}", path)).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Exchange credentials at the token endpoint (form encoded, email as `username`)
    async fn exchange_token(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let request = self
            .client
            .post(self.url(TOKEN_PATH))
            .form(&[("username", email), ("password", password)]);
        let response = self.dispatch(request, "token request").await?;
        Self::parse(response, TOKEN_PATH).await
    }

    async fn register_account(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let request = self
            .client
            .post(self.url(REGISTER_PATH))
            .json(&RegisterRequest { email, password });
        let response = self.dispatch(request, "registration request").await?;
        Self::parse(response, REGISTER_PATH).await
    }

    /// Look up the profile owning `token`, independent of the client's current token
    pub async fn fetch_profile(&self, token: &str) -> Result<UserProfile> {
        let response = self
            .client
            .get(self.url(PROFILE_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::NetworkError)
            .context("Failed to fetch user profile")?;
        let response = Self::check_response(response).await?;
        Self::parse(response, PROFILE_PATH).await
    }

    /// Turn a token response into a grant carrying the authoritative profile.
    async fn grant_from(&self, response: TokenResponse) -> Result<AuthGrant> {
        if response.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("empty access_token".to_string()).into());
        }
        if let Some(kind) = response.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                warn!(token_type = kind, "Unexpected token type");
            }
        }

        let user = match response.user {
            Some(user) => user,
            None => {
                debug!("Token response carried no profile, fetching it");
                self.fetch_profile(&response.access_token).await.map_err(|e| {
                    if matches!(e.downcast_ref::<ApiError>(), Some(ApiError::NotFound(_))) {
                        e.context("Backend does not support profile lookup (GET /users/me)")
                    } else {
                        e
                    }
                })?
            }
        };

        Ok(AuthGrant {
            token: response.access_token,
            user,
        })
    }

    // ===== Flights =====

    pub async fn search_flights(&self, search: &FlightSearchRequest) -> Result<FlightSearchResponse> {
        let response: FlightSearchResponse = self.post(SEARCH_PATH, search).await?;
        debug!(
            search_id = %response.search_id,
            results = response.flights.len(),
            "Flight search completed"
        );
        Ok(response)
    }

    pub async fn predict_price(&self, request: &PricePredictionRequest) -> Result<PricePrediction> {
        self.post(PREDICT_PATH, request).await
    }

    // ===== Alerts =====

    pub async fn list_alerts(&self) -> Result<Vec<Alert>> {
        self.get(ALERTS_PATH).await
    }

    pub async fn create_alert(&self, alert: &AlertCreate) -> Result<Alert> {
        self.post(ALERTS_PATH, alert).await
    }

    pub async fn update_alert(&self, alert_id: i64, update: &AlertUpdate) -> Result<Alert> {
        self.put(&format!("{}/{}", ALERTS_PATH, alert_id), update).await
    }

    pub async fn delete_alert(&self, alert_id: i64) -> Result<()> {
        self.delete(&format!("{}/{}", ALERTS_PATH, alert_id)).await
    }

    /// Ask the backend to simulate a notification for a stored alert
    pub async fn test_alert_notification(&self, alert_id: i64) -> Result<AlertTestResult> {
        let path = format!("{}/{}/notify_test", ALERTS_PATH, alert_id);
        let request = self.client.post(self.url(&path));
        let response = self.dispatch(request, &format!("POST {}", path)).await?;
        Self::parse(response, &path).await
    }

    // ===== History =====

    pub async fn search_history(&self) -> Result<Vec<SearchHistory>> {
        self.get(HISTORY_PATH).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let response = self.exchange_token(email, password).await?;
        self.grant_from(response).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let response = self.register_account(email, password).await?;
        self.grant_from(response).await
    }

    fn set_auth_token(&self, token: Option<&str>) {
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = token.map(str::to_string);
    }
}
