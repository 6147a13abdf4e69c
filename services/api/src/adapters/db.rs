//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AccountStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use noor_core::domain::{HistoryItem, User, UserCredentials};
use noor_core::history::push_entry;
use noor_core::ports::{AccountStore, PortError, PortResult};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AccountStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    name: String,
    hashed_password: Option<String>,
    google_subject: Option<String>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            hashed_password: self.hashed_password,
            google_subject: self.google_subject,
        }
    }

    fn to_domain(self, history: Vec<HistoryItem>) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            history,
        }
    }
}

#[derive(FromRow)]
struct HistoryRecord {
    surah_number: i32,
    surah_name: String,
    english_name: String,
    last_read_ayah: Option<i32>,
    read_at: DateTime<Utc>,
}
impl HistoryRecord {
    fn to_domain(self) -> HistoryItem {
        HistoryItem {
            surah_number: self.surah_number as u32,
            surah_name: self.surah_name,
            english_name: self.english_name,
            last_read_ayah: self.last_read_ayah.map(|a| a as u32),
            timestamp: self.read_at,
        }
    }
}

const USER_COLUMNS: &str = "user_id, email, name, hashed_password, google_subject";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => PortError::Unexpected(other.to_string()),
    }
}

async fn load_history(conn: &mut PgConnection, user_id: Uuid) -> PortResult<Vec<HistoryItem>> {
    let records = sqlx::query_as::<_, HistoryRecord>(
        "SELECT surah_number, surah_name, english_name, last_read_ayah, read_at \
         FROM reading_history WHERE user_id = $1 ORDER BY position ASC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
    .map_err(unexpected)?;
    Ok(records.into_iter().map(|r| r.to_domain()).collect())
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for DbAdapter {
    async fn create_user(
        &self,
        email: &str,
        name: &str,
        hashed_password: Option<&str>,
        google_subject: Option<&str>,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (user_id, email, name, hashed_password, google_subject) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(hashed_password)
        .bind(google_subject)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("User with email {} already exists", email))
            }
            other => unexpected(other),
        })?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", user_id)))?;
        let history = load_history(&mut conn, user_id).await?;
        Ok(record.to_domain(history))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User with email {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_google_subject(&self, subject: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE google_subject = $1"
        ))
        .bind(subject)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("No user linked to Google subject {}", subject)))?;
        Ok(record.to_credentials())
    }

    async fn link_google_subject(&self, user_id: Uuid, subject: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET google_subject = $1 WHERE user_id = $2")
            .bind(subject)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("Google subject {} is already linked", subject))
                }
                other => unexpected(other),
            })?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    /// Locks the user row so concurrent writes for the same user serialize,
    /// then rewrites the ordered history inside one transaction.
    async fn record_history(&self, user_id: Uuid, item: HistoryItem) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", user_id)))?;

        let mut history = load_history(&mut tx, user_id).await?;
        push_entry(&mut history, item);

        sqlx::query("DELETE FROM reading_history WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        for (position, entry) in history.iter().enumerate() {
            sqlx::query(
                "INSERT INTO reading_history \
                 (user_id, position, surah_number, surah_name, english_name, last_read_ayah, read_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(user_id)
            .bind(position as i32)
            .bind(entry.surah_number as i32)
            .bind(&entry.surah_name)
            .bind(&entry.english_name)
            .bind(entry.last_read_ayah.map(|a| a as i32))
            .bind(entry.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain(history))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            other => unexpected(other),
        })?;
        Ok(row.0)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
