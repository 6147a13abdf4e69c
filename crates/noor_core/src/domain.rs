//! crates/noor_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Number of chapters in the Quran.
pub const SURAH_COUNT: u32 = 114;

/// Where a chapter was revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevelationType {
    Meccan,
    Medinan,
    Other(String),
}

impl RevelationType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Meccan" => RevelationType::Meccan,
            "Medinan" => RevelationType::Medinan,
            other => RevelationType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RevelationType::Meccan => "Meccan",
            RevelationType::Medinan => "Medinan",
            RevelationType::Other(s) => s,
        }
    }
}

/// Reference metadata for one chapter (Surah).
#[derive(Debug, Clone, PartialEq)]
pub struct SurahMeta {
    pub number: u32,
    /// Arabic name.
    pub name: String,
    pub english_name: String,
    pub english_name_translation: String,
    pub number_of_ayahs: u32,
    pub revelation_type: RevelationType,
}

/// One verse as delivered by a single edition.
#[derive(Debug, Clone, PartialEq)]
pub struct AyahBase {
    /// Global verse id across the whole corpus.
    pub number: u32,
    pub text: String,
    pub number_in_surah: u32,
    pub juz: u32,
    pub manzil: u32,
    pub page: u32,
    pub ruku: u32,
    pub hizb_quarter: u32,
    pub sajda: bool,
}

/// A full-chapter rendering in one language or script.
#[derive(Debug, Clone, PartialEq)]
pub struct Edition {
    pub identifier: String,
    pub language: String,
    pub name: String,
    pub english_name: String,
    pub format: String,
    pub ayahs: Vec<AyahBase>,
}

/// The three editions a chapter is rendered from, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct EditionSet {
    pub arabic: Edition,
    pub english: Edition,
    pub urdu: Edition,
}

/// A verse with all three renderings side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedAyah {
    pub base: AyahBase,
    pub text_arabic: String,
    pub text_english: String,
    pub text_urdu: String,
}

/// One entry of a user's reading history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub surah_number: u32,
    pub surah_name: String,
    pub english_name: String,
    /// Reserved for resuming inside a chapter; not written yet.
    pub last_read_ayah: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryItem {
    pub fn for_surah(surah: &SurahMeta, timestamp: DateTime<Utc>) -> Self {
        Self {
            surah_number: surah.number,
            surah_name: surah.name.clone(),
            english_name: surah.english_name.clone(),
            last_read_ayah: None,
            timestamp,
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub history: Vec<HistoryItem>,
}

impl User {
    /// First word of the display name, used for greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("User")
    }

    /// Timestamp of the newest reading-history entry.
    pub fn last_read_at(&self) -> Option<DateTime<Utc>> {
        self.history.iter().map(|h| h.timestamp).max()
    }

    /// True when `snapshot` describes this account and is not older than `self`.
    pub fn is_superseded_by(&self, snapshot: &User) -> bool {
        self.user_id == snapshot.user_id && snapshot.last_read_at() >= self.last_read_at()
    }
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    /// Absent for accounts that only ever signed in through Google.
    pub hashed_password: Option<String>,
    pub google_subject: Option<String>,
}

// Represents a login session (auth cookie or persisted device token)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// An identity asserted by a federated provider after token verification.
#[derive(Debug, Clone, PartialEq)]
pub struct FederatedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}
