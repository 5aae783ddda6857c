//! OAuth 2.0 access token refresh
//!
//! Exchanges a stored refresh token for a new access token at the provider's
//! token endpoint (RFC 6749 section 6). Never logs sensitive values.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, TokenRefresher};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # use bridge_traits::time::SystemClock;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig::google("client-id", Some("client-secret".to_string()));
//! let refresher = TokenRefresher::new(config, http_client, Arc::new(SystemClock));
//! let tokens = refresher.refresh_access_token("1//refresh").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::time::Clock;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Google's OAuth 2.0 token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Client registration needed to refresh tokens
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (optional for public clients)
    pub client_secret: Option<String>,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    pub fn google(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Performs refresh-token grants
///
/// One request per call; a failed refresh is reported, not retried.
pub struct TokenRefresher {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl TokenRefresher {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            http_client,
            clock,
        }
    }

    /// Exchange `refresh_token` for a fresh access token.
    ///
    /// The returned token set keeps the old refresh token unless the
    /// provider rotated it.
    ///
    /// # Errors
    ///
    /// [`AuthError::TokenRefreshFailed`] when the endpoint cannot be reached,
    /// rejects the grant, or answers with an unreadable body.
    #[instrument(skip(self, refresh_token), fields(token_url = %self.config.token_url))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Refreshing access token");

        let encoded_body = serde_urlencoded::to_string(&params).map_err(|e| {
            AuthError::TokenRefreshFailed(format!("Failed to encode token request: {}", e))
        })?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if !response.is_success() {
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = response.status, "Token endpoint rejected refresh");

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                response.status, error_body
            )));
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::TokenRefreshFailed(format!("Failed to parse token response: {}", e))
        })?;

        info!(
            expires_in = token_response.expires_in,
            "Successfully refreshed access token"
        );

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            self.clock.now(),
            token_response.expires_in,
        ))
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}
