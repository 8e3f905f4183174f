use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notifications unavailable: {0}")]
    Unavailable(String),

    #[error("Notification backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet
    Undetermined,
}

/// Identifier the platform assigned to a scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data delivered with a notification, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    PriceAlert {
        origin: String,
        destination: String,
        #[serde(rename = "targetPrice")]
        target_price: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
}

/// Platform notification service.
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError>;

    /// Prompt the user. Returns the status after the prompt.
    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError>;

    /// Deliver immediately.
    async fn present(&self, request: &NotificationRequest) -> Result<NotificationId, NotificationError>;

    async fn cancel(&self, id: &NotificationId) -> Result<(), NotificationError>;

    async fn cancel_all(&self) -> Result<(), NotificationError>;
}

/// Schedules local notifications, degrading every failure to "not shown".
#[derive(Clone)]
pub struct Notifier {
    backend: Arc<dyn NotificationBackend>,
}

impl Notifier {
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self { backend }
    }

    /// Whether notifications may be shown, asking the user if they have not decided yet.
    pub async fn ensure_permission(&self) -> bool {
        let status = match self.backend.permission_status().await {
            Ok(PermissionStatus::Undetermined) => self.backend.request_permission().await,
            other => other,
        };
        match status {
            Ok(PermissionStatus::Granted) => true,
            Ok(status) => {
                debug!(?status, "Notification permission not granted");
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to check notification permission");
                false
            }
        }
    }

    /// Show a notification now. `None` means it was skipped; that is never an error.
    pub async fn schedule(&self, request: NotificationRequest) -> Option<NotificationId> {
        if !self.ensure_permission().await {
            warn!("Notification permission not granted, skipping notification");
            return None;
        }
        match self.backend.present(&request).await {
            Ok(id) => {
                debug!(%id, title = %request.title, "Notification scheduled");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "Failed to schedule notification");
                None
            }
        }
    }

    pub async fn cancel(&self, id: &NotificationId) {
        if let Err(e) = self.backend.cancel(id).await {
            warn!(%id, error = %e, "Failed to cancel notification");
        }
    }

    pub async fn cancel_all(&self) {
        if let Err(e) = self.backend.cancel_all().await {
            warn!(error = %e, "Failed to cancel notifications");
        }
    }
}
