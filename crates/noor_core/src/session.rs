//! crates/noor_core/src/session.rs
//!
//! The device-side sign-in session. Owns the persisted session token and
//! publishes the signed-in user through a `watch` channel.
//!
//! Signing in publishes twice: first the bare identity with an empty history,
//! then the full user once it has been re-read from the store. Subscribers only
//! ever observe the latest value.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::accounts::{Accounts, AuthError};
use crate::domain::{SurahMeta, User};
use crate::ports::PreferenceStore;

/// Preference key the session token is stored under.
pub const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Startup, before the stored session has been checked.
    Checking,
    SignedOut,
    SignedIn {
        user: User,
        /// False while only the bare identity is known.
        history_loaded: bool,
    },
}

impl SessionStatus {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionStatus::SignedIn { user, .. } => Some(user),
            _ => None,
        }
    }
}

struct ActiveSession {
    token: String,
    user_id: Uuid,
}

pub struct SessionManager {
    accounts: Accounts,
    prefs: Arc<dyn PreferenceStore>,
    status: watch::Sender<SessionStatus>,
    active: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(accounts: Accounts, prefs: Arc<dyn PreferenceStore>) -> Arc<Self> {
        let (status, _) = watch::channel(SessionStatus::Checking);
        Arc::new(Self {
            accounts,
            prefs,
            status,
            active: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.status.borrow().user().cloned()
    }

    /// Resumes the session stored on the device, if it is still valid.
    pub async fn restore(&self) {
        let token = match self.prefs.get_preference(SESSION_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read stored session: {}", e);
                None
            }
        };
        let Some(token) = token else {
            self.status.send_replace(SessionStatus::SignedOut);
            return;
        };

        let user = match self.accounts.resolve_session(&token).await {
            Ok(user_id) => self.accounts.load_user(user_id).await,
            Err(e) => Err(e),
        };
        match user {
            Ok(user) => {
                info!("Restored session for user {}", user.user_id);
                *self.active.lock().await = Some(ActiveSession {
                    token,
                    user_id: user.user_id,
                });
                self.status.send_replace(SessionStatus::SignedIn {
                    user,
                    history_loaded: true,
                });
            }
            Err(e) => {
                info!("Stored session is no longer usable: {}", e);
                if let Err(e) = self.prefs.remove_preference(SESSION_KEY).await {
                    warn!("Could not clear stored session: {}", e);
                }
                self.status.send_replace(SessionStatus::SignedOut);
            }
        }
    }

    /// Creates an account and signs into it.
    pub async fn register(
        self: &Arc<Self>,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let user = self.accounts.register(name, email, password).await?;
        self.establish(user).await.map(|_| ())
    }

    pub async fn login(self: &Arc<Self>, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.accounts.login(email, password).await?;
        self.establish(user).await
    }

    pub async fn login_with_google(self: &Arc<Self>, id_token: &str) -> Result<User, AuthError> {
        let user = self.accounts.login_with_google(id_token).await?;
        self.establish(user).await
    }

    /// Ends the session on this device. The account itself is untouched.
    pub async fn logout(&self) {
        if let Some(active) = self.active.lock().await.take() {
            if let Err(e) = self.accounts.end_session(&active.token).await {
                warn!("Failed to end session for user {}: {}", active.user_id, e);
            }
        }
        if let Err(e) = self.prefs.remove_preference(SESSION_KEY).await {
            warn!("Could not clear stored session: {}", e);
        }
        self.status.send_replace(SessionStatus::SignedOut);
    }

    /// Records `surah` in the signed-in user's history. Failures are logged and
    /// yield `None`.
    pub async fn record_history(&self, surah: &SurahMeta) -> Option<User> {
        let user_id = self.active.lock().await.as_ref().map(|a| a.user_id)?;
        match self.accounts.record_history(user_id, surah, Utc::now()).await {
            Ok(user) => {
                let snapshot = user.clone();
                // Concurrent writes can return out of order; publish only the newest snapshot.
                self.status.send_if_modified(|status| {
                    let newer = matches!(
                        status,
                        SessionStatus::SignedIn { user: current, .. } if current.is_superseded_by(&snapshot)
                    );
                    if newer {
                        *status = SessionStatus::SignedIn {
                            user: snapshot,
                            history_loaded: true,
                        };
                    }
                    newer
                });
                Some(user)
            }
            Err(e) => {
                error!("Error updating history: {}", e);
                None
            }
        }
    }

    async fn establish(self: &Arc<Self>, user: User) -> Result<User, AuthError> {
        let session = self.accounts.start_session(user.user_id).await?;
        if let Err(e) = self.prefs.set_preference(SESSION_KEY, &session.id).await {
            warn!("Could not persist session token: {}", e);
        }
        *self.active.lock().await = Some(ActiveSession {
            token: session.id,
            user_id: user.user_id,
        });

        self.status.send_replace(SessionStatus::SignedIn {
            user: User {
                history: Vec::new(),
                ..user.clone()
            },
            history_loaded: false,
        });

        let this = Arc::clone(self);
        let user_id = user.user_id;
        tokio::spawn(async move { this.load_full_user(user_id).await });

        Ok(user)
    }

    async fn load_full_user(&self, user_id: Uuid) {
        let user = match self.accounts.load_user(user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!("Background user load failed, keeping basic session: {}", e);
                return;
            }
        };
        // Only upgrade a bare identity; a sign-out or a newer history write wins.
        self.status.send_if_modified(|status| {
            let upgrade = matches!(
                status,
                SessionStatus::SignedIn { user: current, history_loaded: false }
                    if current.user_id == user_id
            );
            if upgrade {
                *status = SessionStatus::SignedIn {
                    user,
                    history_loaded: true,
                };
            }
            upgrade
        });
    }
}
