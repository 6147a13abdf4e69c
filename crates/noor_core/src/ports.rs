//! crates/noor_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{EditionSet, FederatedIdentity, HistoryItem, SurahMeta, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for store and identity port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures of the content path, from transport up to the edition merge.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Could not decode content response: {0}")]
    Decode(String),
    #[error("Surah {0} is outside 1..=114")]
    ChapterOutOfRange(u32),
    #[error("Expected 3 editions for surah {surah}, got {found}")]
    MissingEdition { surah: u32, found: usize },
    #[error(
        "Editions for surah {surah} are out of sync: arabic has {arabic} ayahs, english {english}, urdu {urdu}"
    )]
    EditionMismatch {
        surah: u32,
        arabic: usize,
        english: usize,
        urdu: usize,
    },
}

pub type ContentResult<T> = Result<T, ContentError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read-only access to the remote Quran text corpus.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Fetches the ordered list of all chapters.
    async fn fetch_surah_list(&self) -> ContentResult<Vec<SurahMeta>>;

    /// Fetches the Arabic, English and Urdu editions of one chapter.
    async fn fetch_editions(&self, surah_number: u32) -> ContentResult<EditionSet>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        hashed_password: Option<&str>,
        google_subject: Option<&str>,
    ) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_google_subject(&self, subject: &str) -> PortResult<UserCredentials>;

    async fn link_google_subject(&self, user_id: Uuid, subject: &str) -> PortResult<()>;

    // --- History ---

    /// Atomically applies [`crate::history::push_entry`] to the stored history
    /// and returns the user with the new list.
    async fn record_history(&self, user_id: Uuid, item: HistoryItem) -> PortResult<User>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

/// Small string preferences persisted on the device (theme, session token).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_preference(&self, key: &str) -> PortResult<Option<String>>;

    async fn set_preference(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove_preference(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a Google ID token and returns the identity it asserts.
    async fn verify_google_token(&self, id_token: &str) -> PortResult<FederatedIdentity>;
}
