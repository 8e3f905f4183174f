//! Notifications presented on the terminal.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use farewatch_core::notifications::{
    NotificationBackend, NotificationError, NotificationId, NotificationRequest, PermissionStatus,
};

/// Set to `off` to deny notification permission
pub const NOTIFICATIONS_ENV: &str = "FAREWATCH_NOTIFICATIONS";

pub struct TerminalNotifier {
    enabled: bool,
    next_id: AtomicU64,
}

impl TerminalNotifier {
    pub fn from_env() -> Self {
        let enabled = std::env::var(NOTIFICATIONS_ENV)
            .map(|v| !v.eq_ignore_ascii_case("off"))
            .unwrap_or(true);
        Self {
            enabled,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl NotificationBackend for TerminalNotifier {
    async fn permission_status(&self) -> Result<PermissionStatus, NotificationError> {
        Ok(if self.enabled {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    async fn request_permission(&self) -> Result<PermissionStatus, NotificationError> {
        self.permission_status().await
    }

    async fn present(&self, request: &NotificationRequest) -> Result<NotificationId, NotificationError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        println!();
        println!("  [{}] {}", id, request.title);
        println!("  {}", request.body);
        Ok(NotificationId(id.to_string()))
    }

    // Terminal output cannot be taken back
    async fn cancel(&self, _id: &NotificationId) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}
