//! Authentication module for managing the user session and its credentials.
//!
//! This module provides:
//! - `SessionManager`: Restore, login, register and logout, keeping the
//!   credential store and the API client's bearer token in step
//! - `SecureStore`: Secret storage, backed by the OS keychain (`KeyringStore`),
//!   a passphrase-encrypted file (`EncryptedFileStore`) or memory (`MemoryStore`)
//! - `CredentialRecord`: The token and profile entries persisted between runs

pub mod credentials;
pub mod encrypted;
pub mod session;
pub mod store;

pub use credentials::{CredentialRecord, Credentials, TOKEN_KEY, USER_KEY};
pub use encrypted::EncryptedFileStore;
pub use session::{Session, SessionManager, SessionState};
pub use store::{KeyringStore, MemoryStore, SecureStore, StoreError};
