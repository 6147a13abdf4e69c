//! crates/noor_core/src/accounts.rs
//!
//! Account operations shared by the HTTP service and the device session:
//! registration, password and Google sign-in, auth sessions and history writes.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{AuthSession, HistoryItem, SurahMeta, User};
use crate::ports::{AccountStore, IdentityProvider, PortError};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Lifetime of a login session.
pub fn session_lifetime() -> Duration {
    Duration::days(30)
}

/// Authentication failures. The messages are shown to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password should be at least 6 characters.")]
    WeakPassword,
    #[error("Email is already registered.")]
    EmailInUse,
    #[error("No account found with this email.")]
    UserNotFound,
    #[error("Incorrect password.")]
    WrongPassword,
    #[error("This account signs in with Google.")]
    PasswordNotSet,
    #[error("Google Sign In is not available.")]
    ProviderUnavailable,
    #[error("{0}")]
    Provider(String),
    #[error("Your session has expired. Please sign in again.")]
    InvalidSession,
    #[error("Authentication service error: {0}")]
    Store(PortError),
}

/// A history write that did not land. Logged, never shown.
#[derive(Debug, thiserror::Error)]
#[error("Failed to update history for user {user_id}: {source}")]
pub struct HistoryWriteError {
    pub user_id: Uuid,
    #[source]
    pub source: PortError,
}

#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn AccountStore>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl Accounts {
    pub fn new(store: Arc<dyn AccountStore>, identity: Option<Arc<dyn IdentityProvider>>) -> Self {
        Self { store, identity }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Creates an email/password account.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                AuthError::Store(PortError::Unexpected("Failed to hash password".to_string()))
            })?
            .to_string();

        let user = self
            .store
            .create_user(email, name, Some(&password_hash), None)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => AuthError::EmailInUse,
                other => {
                    error!("Failed to create user: {:?}", other);
                    AuthError::Store(other)
                }
            })?;
        info!("Registered user {}", user.user_id);
        Ok(user)
    }

    /// Checks an email/password pair and returns the full user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let creds = self.store.get_user_by_email(email).await.map_err(|e| match e {
            PortError::NotFound(_) => AuthError::UserNotFound,
            other => AuthError::Store(other),
        })?;

        let stored_hash = creds.hashed_password.as_deref().ok_or(AuthError::PasswordNotSet)?;
        let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
            error!("Failed to parse password hash: {:?}", e);
            AuthError::Store(PortError::Unexpected("Authentication error".to_string()))
        })?;

        let valid = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();
        if !valid {
            return Err(AuthError::WrongPassword);
        }

        self.store.get_user(creds.user_id).await.map_err(AuthError::Store)
    }

    /// Signs in with a Google ID token, creating or linking the account on first use.
    pub async fn login_with_google(&self, id_token: &str) -> Result<User, AuthError> {
        let identity = self.identity.as_ref().ok_or(AuthError::ProviderUnavailable)?;
        let federated = identity.verify_google_token(id_token).await.map_err(|e| {
            error!("Google token verification failed: {}", e);
            match e {
                PortError::Unauthorized => AuthError::Provider("Google Sign In failed".to_string()),
                other => AuthError::Provider(other.to_string()),
            }
        })?;

        match self.store.get_user_by_google_subject(&federated.subject).await {
            Ok(creds) => return self.store.get_user(creds.user_id).await.map_err(AuthError::Store),
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(AuthError::Store(e)),
        }

        match self.store.get_user_by_email(&federated.email).await {
            Ok(creds) => {
                self.store
                    .link_google_subject(creds.user_id, &federated.subject)
                    .await
                    .map_err(AuthError::Store)?;
                info!("Linked Google identity to user {}", creds.user_id);
                self.store.get_user(creds.user_id).await.map_err(AuthError::Store)
            }
            Err(PortError::NotFound(_)) => {
                let name = federated.name.as_deref().unwrap_or("User");
                let user = self
                    .store
                    .create_user(&federated.email, name, None, Some(&federated.subject))
                    .await
                    .map_err(AuthError::Store)?;
                info!("Created user {} from Google sign-in", user.user_id);
                Ok(user)
            }
            Err(e) => Err(AuthError::Store(e)),
        }
    }

    /// Issues a new auth session for `user_id`.
    pub async fn start_session(&self, user_id: Uuid) -> Result<AuthSession, AuthError> {
        let session = AuthSession {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: Utc::now() + session_lifetime(),
        };
        self.store
            .create_auth_session(&session.id, session.user_id, session.expires_at)
            .await
            .map_err(|e| {
                error!("Failed to create auth session: {:?}", e);
                AuthError::Store(e)
            })?;
        Ok(session)
    }

    /// Resolves a session token to the user id it belongs to.
    pub async fn resolve_session(&self, session_id: &str) -> Result<Uuid, AuthError> {
        self.store
            .validate_auth_session(session_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) | PortError::Unauthorized => AuthError::InvalidSession,
                other => AuthError::Store(other),
            })
    }

    pub async fn end_session(&self, session_id: &str) -> Result<(), AuthError> {
        self.store
            .delete_auth_session(session_id)
            .await
            .map_err(AuthError::Store)
    }

    pub async fn load_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store.get_user(user_id).await.map_err(AuthError::Store)
    }

    /// Records that `user_id` opened `surah` at `now` and returns the updated user.
    pub async fn record_history(
        &self,
        user_id: Uuid,
        surah: &SurahMeta,
        now: DateTime<Utc>,
    ) -> Result<User, HistoryWriteError> {
        self.store
            .record_history(user_id, HistoryItem::for_surah(surah, now))
            .await
            .map_err(|source| HistoryWriteError { user_id, source })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{FederatedIdentity, UserCredentials};
    use crate::history::push_entry;
    use crate::ports::{PortResult, PreferenceStore};
    use crate::search::tests::surah;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryState {
        users: HashMap<Uuid, UserCredentials>,
        history: HashMap<Uuid, Vec<HistoryItem>>,
        sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
        prefs: HashMap<String, String>,
    }

    /// In-memory store used by the core tests.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        state: Mutex<MemoryState>,
        pub(crate) fail_history: std::sync::atomic::AtomicBool,
    }

    impl MemoryStore {
        fn user(state: &MemoryState, user_id: Uuid) -> PortResult<User> {
            let creds = state
                .users
                .get(&user_id)
                .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
            Ok(User {
                user_id,
                email: creds.email.clone(),
                name: creds.name.clone(),
                history: state.history.get(&user_id).cloned().unwrap_or_default(),
            })
        }

        pub(crate) fn session_count(&self) -> usize {
            self.state.lock().unwrap().sessions.len()
        }
    }

    #[async_trait]
    impl AccountStore for MemoryStore {
        async fn create_user(
            &self,
            email: &str,
            name: &str,
            hashed_password: Option<&str>,
            google_subject: Option<&str>,
        ) -> PortResult<User> {
            let mut state = self.state.lock().unwrap();
            if state.users.values().any(|u| u.email.eq_ignore_ascii_case(email)) {
                return Err(PortError::Conflict(email.to_string()));
            }
            let user_id = Uuid::new_v4();
            state.users.insert(
                user_id,
                UserCredentials {
                    user_id,
                    email: email.to_string(),
                    name: name.to_string(),
                    hashed_password: hashed_password.map(str::to_string),
                    google_subject: google_subject.map(str::to_string),
                },
            );
            Self::user(&state, user_id)
        }

        async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
            Self::user(&self.state.lock().unwrap(), user_id)
        }

        async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
            let state = self.state.lock().unwrap();
            state
                .users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
                .ok_or_else(|| PortError::NotFound(email.to_string()))
        }

        async fn get_user_by_google_subject(&self, subject: &str) -> PortResult<UserCredentials> {
            let state = self.state.lock().unwrap();
            state
                .users
                .values()
                .find(|u| u.google_subject.as_deref() == Some(subject))
                .cloned()
                .ok_or_else(|| PortError::NotFound(subject.to_string()))
        }

        async fn link_google_subject(&self, user_id: Uuid, subject: &str) -> PortResult<()> {
            let mut state = self.state.lock().unwrap();
            let creds = state
                .users
                .get_mut(&user_id)
                .ok_or_else(|| PortError::NotFound(user_id.to_string()))?;
            creds.google_subject = Some(subject.to_string());
            Ok(())
        }

        async fn record_history(&self, user_id: Uuid, item: HistoryItem) -> PortResult<User> {
            if self.fail_history.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(PortError::Unexpected("history store offline".to_string()));
            }
            let mut state = self.state.lock().unwrap();
            if !state.users.contains_key(&user_id) {
                return Err(PortError::NotFound(user_id.to_string()));
            }
            push_entry(state.history.entry(user_id).or_default(), item);
            Self::user(&state, user_id)
        }

        async fn create_auth_session(
            &self,
            session_id: &str,
            user_id: Uuid,
            expires_at: DateTime<Utc>,
        ) -> PortResult<()> {
            let mut state = self.state.lock().unwrap();
            state
                .sessions
                .insert(session_id.to_string(), (user_id, expires_at));
            Ok(())
        }

        async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
            let state = self.state.lock().unwrap();
            match state.sessions.get(session_id) {
                Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
                Some(_) => Err(PortError::Unauthorized),
                None => Err(PortError::NotFound(session_id.to_string())),
            }
        }

        async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
            self.state.lock().unwrap().sessions.remove(session_id);
            Ok(())
        }
    }

    #[async_trait]
    impl PreferenceStore for MemoryStore {
        async fn get_preference(&self, key: &str) -> PortResult<Option<String>> {
            Ok(self.state.lock().unwrap().prefs.get(key).cloned())
        }

        async fn set_preference(&self, key: &str, value: &str) -> PortResult<()> {
            self.state
                .lock()
                .unwrap()
                .prefs
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove_preference(&self, key: &str) -> PortResult<()> {
            self.state.lock().unwrap().prefs.remove(key);
            Ok(())
        }
    }

    /// Accepts the token "good-<subject>" for `<subject>@gmail.com`.
    pub(crate) struct FakeGoogle;

    #[async_trait]
    impl IdentityProvider for FakeGoogle {
        async fn verify_google_token(&self, id_token: &str) -> PortResult<FederatedIdentity> {
            let subject = id_token.strip_prefix("good-").ok_or(PortError::Unauthorized)?;
            Ok(FederatedIdentity {
                subject: subject.to_string(),
                email: format!("{subject}@gmail.com"),
                name: Some(format!("{subject} Google")),
            })
        }
    }

    pub(crate) fn accounts() -> (Accounts, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let accounts = Accounts::new(store.clone(), Some(Arc::new(FakeGoogle)));
        (accounts, store)
    }

    #[tokio::test]
    async fn register_then_login() {
        let (accounts, _) = accounts();
        let created = accounts
            .register("Aisha Rahman", "aisha@example.com", "secret1")
            .await
            .unwrap();
        assert!(created.history.is_empty());

        let user = accounts.login("aisha@example.com", "secret1").await.unwrap();
        assert_eq!(user.user_id, created.user_id);
        assert_eq!(user.first_name(), "Aisha");
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let (accounts, _) = accounts();
        assert!(matches!(
            accounts.register("", "a@b.c", "secret1").await,
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            accounts.register("A", "not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail)
        ));
        let weak = accounts.register("A", "a@b.c", "12345").await.unwrap_err();
        assert_eq!(weak.to_string(), "Password should be at least 6 characters.");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (accounts, _) = accounts();
        accounts.register("A", "a@b.c", "secret1").await.unwrap();
        let err = accounts.register("B", "a@b.c", "secret2").await.unwrap_err();
        assert_eq!(err.to_string(), "Email is already registered.");
    }

    #[tokio::test]
    async fn login_reports_unknown_email_and_bad_password() {
        let (accounts, _) = accounts();
        accounts.register("A", "a@b.c", "secret1").await.unwrap();
        assert!(matches!(
            accounts.login("x@b.c", "secret1").await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            accounts.login("a@b.c", "wrong-pass").await,
            Err(AuthError::WrongPassword)
        ));
    }

    #[tokio::test]
    async fn google_login_creates_then_reuses_account() {
        let (accounts, _) = accounts();
        let first = accounts.login_with_google("good-omar").await.unwrap();
        let second = accounts.login_with_google("good-omar").await.unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.email, "omar@gmail.com");
        assert_eq!(first.name, "omar Google");
    }

    #[tokio::test]
    async fn google_login_links_existing_email_account() {
        let (accounts, _) = accounts();
        let existing = accounts.register("Omar", "omar@gmail.com", "secret1").await.unwrap();
        let via_google = accounts.login_with_google("good-omar").await.unwrap();
        assert_eq!(existing.user_id, via_google.user_id);
        // Password login keeps working after linking.
        assert!(accounts.login("omar@gmail.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn google_failures_surface_as_provider_errors() {
        let (accounts, _) = accounts();
        assert!(matches!(
            accounts.login_with_google("forged").await,
            Err(AuthError::Provider(_))
        ));

        let without = Accounts::new(Arc::new(MemoryStore::default()), None);
        assert!(matches!(
            without.login_with_google("good-x").await,
            Err(AuthError::ProviderUnavailable)
        ));
    }

    #[tokio::test]
    async fn google_only_accounts_cannot_use_password_login() {
        let (accounts, _) = accounts();
        accounts.login_with_google("good-zaid").await.unwrap();
        assert!(matches!(
            accounts.login("zaid@gmail.com", "anything").await,
            Err(AuthError::PasswordNotSet)
        ));
    }

    #[tokio::test]
    async fn sessions_resolve_until_ended() {
        let (accounts, store) = accounts();
        let user = accounts.register("A", "a@b.c", "secret1").await.unwrap();
        let session = accounts.start_session(user.user_id).await.unwrap();
        assert!(session.expires_at > Utc::now() + Duration::days(29));

        assert_eq!(accounts.resolve_session(&session.id).await.unwrap(), user.user_id);
        accounts.end_session(&session.id).await.unwrap();
        assert!(matches!(
            accounts.resolve_session(&session.id).await,
            Err(AuthError::InvalidSession)
        ));
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn history_write_returns_updated_user() {
        let (accounts, _) = accounts();
        let user = accounts.register("A", "a@b.c", "secret1").await.unwrap();
        let baqara = surah(2, "Al-Baqara", "The Cow");

        let updated = accounts
            .record_history(user.user_id, &baqara, Utc::now())
            .await
            .unwrap();

        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].surah_number, 2);
        assert_eq!(updated.history[0].english_name, "Al-Baqara");
    }
}
