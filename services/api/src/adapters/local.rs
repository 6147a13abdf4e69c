//! services/api/src/adapters/local.rs
//!
//! A single-file JSON store implementing both `AccountStore` and
//! `PreferenceStore`, for running without a database.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use noor_core::domain::{HistoryItem, User, UserCredentials};
use noor_core::history::push_entry;
use noor_core::ports::{AccountStore, PortError, PortResult, PreferenceStore};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Default, Serialize, Deserialize)]
struct LocalData {
    #[serde(default)]
    users: Vec<StoredUser>,
    #[serde(default)]
    sessions: Vec<StoredSession>,
    #[serde(default)]
    preferences: BTreeMap<String, String>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    user_id: Uuid,
    email: String,
    name: String,
    hashed_password: Option<String>,
    google_subject: Option<String>,
    #[serde(default)]
    history: Vec<StoredHistory>,
}
impl StoredUser {
    fn to_credentials(&self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            hashed_password: self.hashed_password.clone(),
            google_subject: self.google_subject.clone(),
        }
    }

    fn to_domain(&self) -> User {
        User {
            user_id: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            history: self.history.iter().map(StoredHistory::to_domain).collect(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHistory {
    surah_number: u32,
    surah_name: String,
    english_name: String,
    last_read_ayah: Option<u32>,
    timestamp: DateTime<Utc>,
}
impl StoredHistory {
    fn to_domain(&self) -> HistoryItem {
        HistoryItem {
            surah_number: self.surah_number,
            surah_name: self.surah_name.clone(),
            english_name: self.english_name.clone(),
            last_read_ayah: self.last_read_ayah,
            timestamp: self.timestamp,
        }
    }

    fn from_domain(item: HistoryItem) -> Self {
        Self {
            surah_number: item.surah_number,
            surah_name: item.surah_name,
            english_name: item.english_name,
            last_read_ayah: item.last_read_ayah,
            timestamp: item.timestamp,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Every mutation happens under one lock. A change becomes visible only after
/// it has been flushed to disk.
pub struct LocalStore {
    path: PathBuf,
    data: Mutex<LocalData>,
}

impl LocalStore {
    /// Opens the store at `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> PortResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PortError::Unexpected(format!("Corrupt store file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store file at {}, starting empty", path.display());
                LocalData::default()
            }
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    async fn persist(&self, data: &LocalData) -> PortResult<()> {
        let bytes = serde_json::to_vec_pretty(data).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!("Flushed store to {}", self.path.display());
        Ok(())
    }

    /// Applies `change` to a copy of the data and keeps the copy only once it
    /// is on disk.
    async fn commit<T, F>(&self, change: F) -> PortResult<T>
    where
        F: FnOnce(&mut LocalData) -> PortResult<T>,
    {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *data = next;
        Ok(out)
    }
}

fn user_not_found(user_id: Uuid) -> PortError {
    PortError::NotFound(format!("User {} not found", user_id))
}

#[async_trait]
impl AccountStore for LocalStore {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        hashed_password: Option<&str>,
        google_subject: Option<&str>,
    ) -> PortResult<User> {
        self.commit(|data| {
            if data.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
                return Err(PortError::Conflict(format!("User with email {} already exists", email)));
            }
            let user = StoredUser {
                user_id: Uuid::new_v4(),
                email: email.to_string(),
                name: name.to_string(),
                hashed_password: hashed_password.map(str::to_string),
                google_subject: google_subject.map(str::to_string),
                history: Vec::new(),
            };
            let created = user.to_domain();
            data.users.push(user);
            Ok(created)
        })
        .await
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let data = self.data.lock().await;
        data.users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(StoredUser::to_domain)
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let data = self.data.lock().await;
        data.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(StoredUser::to_credentials)
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn get_user_by_google_subject(&self, subject: &str) -> PortResult<UserCredentials> {
        let data = self.data.lock().await;
        data.users
            .iter()
            .find(|u| u.google_subject.as_deref() == Some(subject))
            .map(StoredUser::to_credentials)
            .ok_or_else(|| PortError::NotFound(format!("No user linked to Google subject {}", subject)))
    }

    async fn link_google_subject(&self, user_id: Uuid, subject: &str) -> PortResult<()> {
        self.commit(|data| {
            if data
                .users
                .iter()
                .any(|u| u.user_id != user_id && u.google_subject.as_deref() == Some(subject))
            {
                return Err(PortError::Conflict(format!("Google subject {} is already linked", subject)));
            }
            let user = data
                .users
                .iter_mut()
                .find(|u| u.user_id == user_id)
                .ok_or_else(|| user_not_found(user_id))?;
            user.google_subject = Some(subject.to_string());
            Ok(())
        })
        .await
    }

    async fn record_history(&self, user_id: Uuid, item: HistoryItem) -> PortResult<User> {
        self.commit(|data| {
            let user = data
                .users
                .iter_mut()
                .find(|u| u.user_id == user_id)
                .ok_or_else(|| user_not_found(user_id))?;

            let mut history: Vec<HistoryItem> = user.history.iter().map(StoredHistory::to_domain).collect();
            push_entry(&mut history, item);
            user.history = history.into_iter().map(StoredHistory::from_domain).collect();
            Ok(user.to_domain())
        })
        .await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.commit(|data| {
            let now = Utc::now();
            data.sessions.retain(|s| s.expires_at > now);
            data.sessions.push(StoredSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            });
            Ok(())
        })
        .await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let data = self.data.lock().await;
        let now = Utc::now();
        data.sessions
            .iter()
            .find(|s| s.id == session_id && s.expires_at > now)
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.commit(|data| {
            data.sessions.retain(|s| s.id != session_id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PreferenceStore for LocalStore {
    async fn get_preference(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.data.lock().await.preferences.get(key).cloned())
    }

    async fn set_preference(&self, key: &str, value: &str) -> PortResult<()> {
        self.commit(|data| {
            data.preferences.insert(key.to_string(), value.to_string());
            Ok(())
        })
        .await
    }

    async fn remove_preference(&self, key: &str) -> PortResult<()> {
        self.commit(|data| {
            data.preferences.remove(key);
            Ok(())
        })
        .await
    }
}
