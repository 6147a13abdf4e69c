//! services/api/src/adapters/google.rs
//!
//! Verifies Google ID tokens through the public tokeninfo endpoint.
//! It implements the `IdentityProvider` port from the `core` crate.

use async_trait::async_trait;
use noor_core::domain::FederatedIdentity;
use noor_core::ports::{IdentityProvider, PortError, PortResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Clone)]
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: &str, timeout: Duration) -> reqwest::Result<Self> {
        Self::with_endpoint(TOKENINFO_URL, client_id, timeout)
    }

    pub fn with_endpoint(endpoint: &str, client_id: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    /// Sent as the string `"true"` or `"false"`.
    #[serde(default)]
    email_verified: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl IdentityProvider for GoogleTokenVerifier {
    async fn verify_google_token(&self, id_token: &str) -> PortResult<FederatedIdentity> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Google Sign In failed: {}", e)))?;

        if response.status().is_client_error() {
            return Err(PortError::Unauthorized);
        }
        let info = response
            .error_for_status()
            .map_err(|e| PortError::Unexpected(format!("Google Sign In failed: {}", e)))?
            .json::<TokenInfo>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Google Sign In failed: {}", e)))?;

        if info.aud != self.client_id {
            warn!("Rejected Google token issued for another client");
            return Err(PortError::Unauthorized);
        }
        // Accounts are linked by email, so the address must be confirmed by Google.
        if info.email_verified.as_deref() != Some("true") {
            warn!("Rejected Google token without a verified email");
            return Err(PortError::Unauthorized);
        }
        let email = info.email.ok_or(PortError::Unauthorized)?;

        Ok(FederatedIdentity {
            subject: info.sub,
            email,
            name: info.name,
        })
    }
}
