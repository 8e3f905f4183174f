use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{AuthApi, AuthGrant};
use crate::models::UserProfile;

use super::credentials::{CredentialRecord, Credentials};
use super::store::SecureStore;

/// Lifecycle state derived from a `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stored credentials have not been read yet
    Restoring,
    Authenticated,
    Anonymous,
}

/// The client's belief about who is signed in.
///
/// Token and user are held as one `Option<Credentials>`, so a token without a
/// user (or the reverse) cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
    is_loading: bool,
}

impl Session {
    fn restoring() -> Self {
        Self {
            credentials: None,
            is_loading: true,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.credentials.as_ref().map(|c| &c.user)
    }

    /// True only until the stored session has been read
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn state(&self) -> SessionState {
        match (self.is_loading, &self.credentials) {
            (true, _) => SessionState::Restoring,
            (false, Some(_)) => SessionState::Authenticated,
            (false, None) => SessionState::Anonymous,
        }
    }
}

/// Owns the session and keeps the credential store and the API client's
/// bearer token in step with it.
///
/// Operations take `&self` and do not lock across awaits: overlapping calls
/// interleave at their await points and the last write wins. Callers that need
/// strict ordering must not start a second operation before the first resolves.
pub struct SessionManager {
    store: Arc<dyn SecureStore>,
    api: Arc<dyn AuthApi>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    /// Create a manager in the `Restoring` state. Call `restore` next.
    pub fn new(store: Arc<dyn SecureStore>, api: Arc<dyn AuthApi>) -> Self {
        let (state, _) = watch::channel(Session::restoring());
        Self { store, api, state }
    }

    /// Create a manager and restore the stored session.
    pub async fn start(store: Arc<dyn SecureStore>, api: Arc<dyn AuthApi>) -> Self {
        let manager = Self::new(store, api);
        manager.restore().await;
        manager
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Watch for session changes
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Read the stored session and leave the `Restoring` state.
    ///
    /// Any failure (store error, missing entry, unparsable profile) ends in
    /// `Anonymous` without surfacing an error. Only the first call does work.
    pub async fn restore(&self) {
        if !self.state.borrow().is_loading {
            debug!("Session already restored");
            return;
        }

        let credentials = match CredentialRecord::load(self.store.as_ref()) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, continuing signed out");
                None
            }
        };

        if let Some(ref credentials) = credentials {
            self.api.set_auth_token(Some(&credentials.token));
            info!(user_id = credentials.user.id, "Restored stored session");
        } else {
            debug!("No stored session");
        }

        self.state.send_replace(Session {
            credentials,
            is_loading: false,
        });
    }

    /// Sign in. Returns `false` on any failure, leaving the previous session untouched.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.try_login(email, password).await.is_ok()
    }

    /// Create an account and sign in with it. Same failure rules as `login`.
    pub async fn register(&self, email: &str, password: &str) -> bool {
        self.try_register(email, password).await.is_ok()
    }

    /// `login`, keeping the reason for a failure.
    pub async fn try_login(&self, email: &str, password: &str) -> Result<()> {
        let grant = self.api.login(email, password).await.inspect_err(|e| {
            warn!(error = %format!("{:#}", e), "Login failed");
        })?;
        self.establish(grant)
    }

    /// `register`, keeping the reason for a failure.
    pub async fn try_register(&self, email: &str, password: &str) -> Result<()> {
        let grant = self.api.register(email, password).await.inspect_err(|e| {
            warn!(error = %format!("{:#}", e), "Registration failed");
        })?;
        self.establish(grant)
    }

    /// Persist, then publish in memory, then hand the token to the API client.
    fn establish(&self, grant: AuthGrant) -> Result<()> {
        let credentials = Credentials {
            token: grant.token,
            user: grant.user,
        };

        if let Err(e) = CredentialRecord::save(self.store.as_ref(), &credentials) {
            warn!(error = %e, "Failed to persist session, sign-in aborted");
            return Err(e);
        }

        let token = credentials.token.clone();
        let user_id = credentials.user.id;
        self.state.send_modify(|session| {
            session.credentials = Some(credentials);
            session.is_loading = false;
        });
        self.api.set_auth_token(Some(&token));

        info!(user_id, "Signed in");
        Ok(())
    }

    /// Sign out. Store delete failures are logged; memory and the API token are cleared regardless.
    pub async fn logout(&self) {
        if let Err(e) = CredentialRecord::clear(self.store.as_ref()) {
            warn!(error = %e, "Failed to delete stored session");
        }

        self.state.send_modify(|session| {
            session.credentials = None;
            session.is_loading = false;
        });
        self.api.set_auth_token(None);

        info!("Signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{TOKEN_KEY, USER_KEY};
    use crate::auth::encrypted::EncryptedFileStore;
    use crate::auth::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeApi {
        /// Login outcome: `Some(token)` succeeds with profile id 7
        accept: Mutex<Option<String>>,
        token: Mutex<Option<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn accepting(token: &str) -> Arc<Self> {
            let api = Self::default();
            *api.accept.lock().unwrap() = Some(token.to_string());
            Arc::new(api)
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn current_token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        fn grant(&self, endpoint: &str, email: &str) -> Result<AuthGrant> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            match self.accept.lock().unwrap().clone() {
                Some(token) => Ok(AuthGrant {
                    token,
                    user: UserProfile::new(7, email),
                }),
                None => Err(anyhow::anyhow!("Unauthorized - token may be expired")),
            }
        }
    }

    #[async_trait]
    impl AuthApi for FakeApi {
        async fn login(&self, email: &str, _password: &str) -> Result<AuthGrant> {
            self.grant("token", email)
        }

        async fn register(&self, email: &str, _password: &str) -> Result<AuthGrant> {
            self.grant("register", email)
        }

        fn set_auth_token(&self, token: Option<&str>) {
            *self.token.lock().unwrap() = token.map(str::to_string);
        }
    }

    /// Store whose reads, writes or deletes can be switched to fail.
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        fail_reads: Mutex<bool>,
        fail_set_key: Mutex<Option<&'static str>>,
        fail_deletes: Mutex<bool>,
    }

    impl SecureStore for FaultyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if *self.fail_reads.lock().unwrap() {
                return Err(StoreError::Io(std::io::Error::other("locked")));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_set_key.lock().unwrap().is_some_and(|k| k == key) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), StoreError> {
            if *self.fail_deletes.lock().unwrap() {
                return Err(StoreError::Io(std::io::Error::other("read-only")));
            }
            self.inner.delete(key)
        }
    }

    // -------------------------------------------------------------------------
    // Restore
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_new_manager_is_restoring() {
        let manager = SessionManager::new(Arc::new(MemoryStore::new()), FakeApi::rejecting());
        let session = manager.session();
        assert!(session.is_loading());
        assert_eq!(session.state(), SessionState::Restoring);
    }

    #[tokio::test]
    async fn test_login_then_fresh_restore_round_trips() {
        let store: Arc<dyn SecureStore> = Arc::new(MemoryStore::new());
        let api = FakeApi::accepting("jwt-1");
        let manager = SessionManager::start(store.clone(), api.clone()).await;
        assert!(manager.login("ana@example.com", "pw").await);
        let before = manager.session();

        let fresh_api = FakeApi::rejecting();
        let restored = SessionManager::start(store, fresh_api.clone()).await;
        let after = restored.session();

        assert_eq!(after.token(), before.token());
        assert_eq!(after.user(), before.user());
        assert!(!after.is_loading());
        assert_eq!(after.state(), SessionState::Authenticated);
        assert_eq!(fresh_api.current_token().as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_restore_with_only_token_is_anonymous() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "orphan").unwrap();
        let api = FakeApi::rejecting();

        let manager = SessionManager::start(store, api.clone()).await;
        let session = manager.session();
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(api.current_token(), None);
    }

    #[tokio::test]
    async fn test_restore_with_only_user_is_anonymous() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_KEY, r#"{"id":1,"email":"a@b.co"}"#).unwrap();

        let manager = SessionManager::start(store, FakeApi::rejecting()).await;
        assert_eq!(manager.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_store_error_is_anonymous() {
        let store = Arc::new(FaultyStore::default());
        *store.fail_reads.lock().unwrap() = true;

        let manager = SessionManager::start(store, FakeApi::rejecting()).await;
        let session = manager.session();
        assert!(!session.is_loading());
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_runs_once() {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::start(store.clone(), FakeApi::rejecting()).await;

        // Credentials appearing later are not picked up by a second restore
        CredentialRecord::save(
            store.as_ref(),
            &Credentials {
                token: "late".to_string(),
                user: UserProfile::new(1, "a@b.co"),
            },
        )
        .unwrap();
        manager.restore().await;
        assert_eq!(manager.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_subscribers_see_restore_finish() {
        let manager = SessionManager::new(Arc::new(MemoryStore::new()), FakeApi::rejecting());
        let mut rx = manager.subscribe();
        assert!(rx.borrow().is_loading());

        manager.restore().await;
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_loading());
    }

    // -------------------------------------------------------------------------
    // Login / register
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_success_updates_everything() {
        let store = Arc::new(MemoryStore::new());
        let api = FakeApi::accepting("jwt-1");
        let manager = SessionManager::start(store.clone(), api.clone()).await;

        assert!(manager.login("ana@example.com", "pw").await);

        let session = manager.session();
        assert_eq!(session.token(), Some("jwt-1"));
        assert_eq!(session.user(), Some(&UserProfile::new(7, "ana@example.com")));
        assert_eq!(api.current_token().as_deref(), Some("jwt-1"));
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
        assert_eq!(
            store.get(USER_KEY).unwrap().as_deref(),
            Some(r#"{"id":7,"email":"ana@example.com"}"#)
        );
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::new());
        let api = FakeApi::rejecting();
        let manager = SessionManager::start(store.clone(), api.clone()).await;

        assert!(!manager.login("ana@example.com", "wrong").await);
        assert_eq!(manager.session().state(), SessionState::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(api.current_token(), None);
    }

    #[tokio::test]
    async fn test_login_store_failure_is_atomic() {
        let store = Arc::new(FaultyStore::default());
        *store.fail_set_key.lock().unwrap() = Some(USER_KEY);
        let api = FakeApi::accepting("jwt-1");
        let manager = SessionManager::start(store.clone(), api.clone()).await;

        assert!(!manager.login("ana@example.com", "pw").await);

        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        assert_eq!(manager.session().state(), SessionState::Anonymous);
        assert_eq!(api.current_token(), None);
    }

    #[tokio::test]
    async fn test_failed_relogin_keeps_previous_session() {
        let store = Arc::new(FaultyStore::default());
        let api = FakeApi::accepting("jwt-1");
        let manager = SessionManager::start(store.clone(), api.clone()).await;
        assert!(manager.login("ana@example.com", "pw").await);

        *api.accept.lock().unwrap() = Some("jwt-2".to_string());
        *store.fail_set_key.lock().unwrap() = Some(USER_KEY);
        assert!(!manager.login("bia@example.com", "pw").await);

        assert_eq!(manager.session().token(), Some("jwt-1"));
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
        assert_eq!(api.current_token().as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_try_login_reports_cause() {
        let api = FakeApi::rejecting();
        let manager = SessionManager::start(Arc::new(MemoryStore::new()), api.clone()).await;

        let err = manager.try_login("ana@example.com", "nope").await.unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
        assert_eq!(manager.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_session_survives_restart_with_encrypted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = Arc::new(EncryptedFileStore::open(&path, "hunter2").unwrap());
        let manager = SessionManager::start(store, FakeApi::accepting("jwt-1")).await;
        assert!(manager.login("ana@example.com", "pw").await);
        drop(manager);

        let api = FakeApi::rejecting();
        let store = Arc::new(EncryptedFileStore::open(&path, "hunter2").unwrap());
        let manager = SessionManager::start(store, api.clone()).await;
        assert_eq!(manager.session().state(), SessionState::Authenticated);
        assert_eq!(manager.session().user(), Some(&UserProfile::new(7, "ana@example.com")));
        assert_eq!(api.current_token().as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_register_uses_register_endpoint() {
        let api = FakeApi::accepting("jwt-new");
        let manager = SessionManager::start(Arc::new(MemoryStore::new()), api.clone()).await;

        assert!(manager.register("new@example.com", "pw").await);
        assert_eq!(*api.calls.lock().unwrap(), vec!["register".to_string()]);
        assert_eq!(manager.session().token(), Some("jwt-new"));
    }

    // -------------------------------------------------------------------------
    // Logout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let store = Arc::new(MemoryStore::new());
        let api = FakeApi::accepting("jwt-1");
        let manager = SessionManager::start(store.clone(), api.clone()).await;
        assert!(manager.login("ana@example.com", "pw").await);

        manager.logout().await;
        assert_eq!(manager.session().state(), SessionState::Anonymous);
        assert_eq!(api.current_token(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_memory_when_delete_fails() {
        let store = Arc::new(FaultyStore::default());
        let api = FakeApi::accepting("jwt-1");
        let manager = SessionManager::start(store.clone(), api.clone()).await;
        assert!(manager.login("ana@example.com", "pw").await);

        *store.fail_deletes.lock().unwrap() = true;
        manager.logout().await;

        let session = manager.session();
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert_eq!(api.current_token(), None);
    }
}
