use anyhow::{Context, Result};
use tracing::warn;

use crate::models::UserProfile;

use super::store::{SecureStore, StoreError};

/// Store key holding the raw bearer token
pub const TOKEN_KEY: &str = "userToken";

/// Store key holding the JSON-serialized `UserProfile`
pub const USER_KEY: &str = "userData";

/// The persisted half of a session: a token and the profile it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user: UserProfile,
}

/// Reads and writes `Credentials` as two store entries that live and die together.
pub struct CredentialRecord;

impl CredentialRecord {
    /// Read both entries.
    ///
    /// Returns `Ok(None)` when either entry is missing or the profile does not
    /// parse; only store failures are errors.
    pub fn load(store: &dyn SecureStore) -> Result<Option<Credentials>, StoreError> {
        let token = store.get(TOKEN_KEY)?;
        let user = store.get(USER_KEY)?;

        match (token, user) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<UserProfile>(&user_json) {
                Ok(user) => Ok(Some(Credentials { token, user })),
                Err(e) => {
                    warn!(error = %e, "Stored profile is not valid JSON, ignoring stored session");
                    Ok(None)
                }
            },
            (None, None) => Ok(None),
            (token, _) => {
                warn!(
                    has_token = token.is_some(),
                    "Only one credential entry present, ignoring stored session"
                );
                Ok(None)
            }
        }
    }

    /// Write both entries, token first.
    ///
    /// If the profile write fails the token is put back to what it held before
    /// the call. If that fails as well both entries are deleted, so the store
    /// never pairs a token with a foreign profile.
    pub fn save(store: &dyn SecureStore, credentials: &Credentials) -> Result<()> {
        let user_json =
            serde_json::to_string(&credentials.user).context("Failed to serialize user profile")?;

        let previous_token = store.get(TOKEN_KEY).context("Failed to read stored token")?;

        store
            .set(TOKEN_KEY, &credentials.token)
            .context("Failed to persist token")?;

        if let Err(e) = store.set(USER_KEY, &user_json) {
            let rolled_back = match previous_token.as_deref() {
                Some(token) => store.set(TOKEN_KEY, token),
                None => store.delete(TOKEN_KEY),
            };
            if let Err(rollback) = rolled_back {
                warn!(error = %rollback, "Failed to roll back token, clearing stored session");
                if let Err(clear) = Self::clear(store) {
                    warn!(error = %clear, "Failed to clear stored session");
                }
            }
            return Err(e).context("Failed to persist credentials");
        }
        Ok(())
    }

    /// Delete both entries. Both deletes are attempted; the first failure is returned.
    pub fn clear(store: &dyn SecureStore) -> Result<(), StoreError> {
        let token_result = store.delete(TOKEN_KEY);
        let user_result = store.delete(USER_KEY);
        token_result.and(user_result)
    }
}
