//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use noor_core::MergePolicy;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where accounts, sessions and history live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountBackend {
    Postgres { database_url: String },
    Local { path: PathBuf },
}

/// The three edition identifiers requested for every chapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Editions {
    pub arabic: String,
    pub english: String,
    pub urdu: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub account_backend: AccountBackend,
    pub quran_api_base_url: String,
    pub editions: Editions,
    pub merge_policy: MergePolicy,
    pub http_timeout: Duration,
    pub google_client_id: Option<String>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        // --- Server and logging ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Account storage ---
        let account_backend = match or_default("ACCOUNT_BACKEND", "local").to_lowercase().as_str() {
            "postgres" => AccountBackend::Postgres {
                database_url: var("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "local" => AccountBackend::Local {
                path: PathBuf::from(or_default("LOCAL_STORE_PATH", "./noor-data.json")),
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "ACCOUNT_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, local", other),
                ))
            }
        };

        // --- Content API ---
        let quran_api_base_url = or_default("QURAN_API_BASE_URL", "https://api.alquran.cloud/v1")
            .trim_end_matches('/')
            .to_string();
        let editions = Editions {
            arabic: or_default("ARABIC_EDITION", "quran-uthmani"),
            english: or_default("ENGLISH_EDITION", "en.asad"),
            urdu: or_default("URDU_EDITION", "ur.jalandhry"),
        };
        let merge_policy = MergePolicy::from_str(&or_default("CONTENT_MERGE_POLICY", "strict"))
            .map_err(|e| ConfigError::InvalidValue("CONTENT_MERGE_POLICY".to_string(), e))?;

        let timeout_str = or_default("HTTP_TIMEOUT_SECS", "15");
        let http_timeout = timeout_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue("HTTP_TIMEOUT_SECS".to_string(), e.to_string()))?;

        // --- Identity and browser access ---
        let google_client_id = var("GOOGLE_CLIENT_ID").filter(|s| !s.is_empty());
        let cors_origin = or_default("CORS_ORIGIN", "http://localhost:5173");

        Ok(Self {
            bind_address,
            log_level,
            account_backend,
            quran_api_base_url,
            editions,
            merge_policy,
            http_timeout,
            google_client_id,
            cors_origin,
        })
    }
}
