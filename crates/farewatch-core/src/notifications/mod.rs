//! Local notifications.
//!
//! `Notifier` wraps a platform `NotificationBackend`: it asks for permission
//! when the user has not decided yet, delivers immediately, and turns every
//! failure into a skipped notification.

pub mod scheduler;

pub use scheduler::{
    NotificationBackend, NotificationError, NotificationId, NotificationPayload,
    NotificationRequest, Notifier, PermissionStatus,
};
