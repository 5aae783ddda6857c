//! Session establishment from a stored credential file
//!
//! Reads the "authorized user" JSON written by Google's OAuth client
//! libraries, refreshes the access token when it is expired or about to be,
//! and writes the refreshed token back so the next run starts warm.

use crate::error::{AuthError, Result};
use crate::manager::SessionManager;
use crate::oauth::{OAuthConfig, TokenRefresher, GOOGLE_TOKEN_URL};
use crate::types::{AuthorizedUserFile, OAuthTokens};
use bridge_traits::http::HttpClient;
use bridge_traits::time::Clock;
use chrono::{DateTime, SecondsFormat, Utc};
use core_runtime::logging::strip_path;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Tokens expiring within this window are refreshed up front
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Access token and its expiry
#[derive(Clone)]
pub struct Session {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
    refreshed: bool,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            refreshed: false,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token came from a refresh rather than the stored file
    pub fn was_refreshed(&self) -> bool {
        self.refreshed
    }

    /// Whether the token expires within `buffer_seconds` of `now`
    pub fn is_expiring(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now >= expires_at - chrono::Duration::seconds(buffer_seconds))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("refreshed", &self.refreshed)
            .finish()
    }
}

/// Builds a [`Session`] from a credential file
pub struct SessionEstablisher {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl SessionEstablisher {
    pub fn new(http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self { http_client, clock }
    }

    /// Establish a session from the credential file at `path`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::CredentialFileMissing`] if the file does not exist
    /// - [`AuthError::CredentialFileMalformed`] if it cannot be read or parsed,
    ///   or holds neither an access token nor a refresh token
    /// - [`AuthError::TokenExpired`] if the token is stale and cannot be refreshed
    /// - [`AuthError::TokenRefreshFailed`] if the token endpoint refused
    pub async fn establish(&self, path: &Path) -> Result<Session> {
        let (session, _) = self.establish_renewable(path).await?;
        Ok(session)
    }

    /// Establish a session that keeps itself valid for the rest of the run.
    ///
    /// Fails the same way as [`SessionEstablisher::establish`].
    pub async fn manage(&self, path: &Path) -> Result<SessionManager> {
        let (session, renewal) = self.establish_renewable(path).await?;
        Ok(SessionManager::new(session, renewal, self.clock.clone()))
    }

    #[instrument(skip_all)]
    async fn establish_renewable(&self, path: &Path) -> Result<(Session, Option<Renewal>)> {
        let display_path = path.to_string_lossy();
        info!(file = %strip_path(&display_path), "Reading credential file");

        let (document, credentials) = read_credential_file(path).await?;
        let now = self.clock.now();

        let renewal = credentials.can_refresh().then(|| Renewal {
            refresher: TokenRefresher::new(
                OAuthConfig {
                    client_id: credentials.client_id.clone().unwrap_or_default(),
                    client_secret: credentials.client_secret.clone(),
                    token_url: credentials
                        .token_uri
                        .clone()
                        .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
                },
                self.http_client.clone(),
                self.clock.clone(),
            ),
            refresh_token: credentials.refresh_token.clone().unwrap_or_default(),
            path: path.to_path_buf(),
            document,
        });

        if let Some(tokens) = credentials.tokens() {
            if !tokens.is_expired_with_buffer(now, EXPIRY_BUFFER_SECS) {
                info!(expires_at = ?tokens.expires_at, "Using stored access token");
                return Ok((Session::new(tokens.access_token, tokens.expires_at), renewal));
            }
            info!("Stored access token has expired");
        } else if renewal.is_none() {
            return Err(AuthError::CredentialFileMalformed {
                path: path.to_path_buf(),
                reason: "no access token or refresh token".to_string(),
            });
        }

        let Some(mut renewal) = renewal else {
            return Err(AuthError::TokenExpired);
        };

        let session = renewal.renew().await?;
        Ok((session, Some(renewal)))
    }
}

/// What a later refresh needs: the grant, and where to store its result
pub(crate) struct Renewal {
    refresher: TokenRefresher,
    refresh_token: String,
    path: PathBuf,
    document: Map<String, Value>,
}

impl Renewal {
    /// Refresh the access token and save it to the credential file
    pub(crate) async fn renew(&mut self) -> Result<Session> {
        let tokens = self
            .refresher
            .refresh_access_token(&self.refresh_token)
            .await?;

        if let Some(rotated) = &tokens.refresh_token {
            self.refresh_token = rotated.clone();
        }

        if let Err(e) = write_back(&self.path, self.document.clone(), &tokens).await {
            warn!(error = %e, "Could not save refreshed token, continuing");
        }

        let mut session = Session::new(tokens.access_token, tokens.expires_at);
        session.refreshed = true;
        Ok(session)
    }
}

async fn read_credential_file(path: &Path) -> Result<(Map<String, Value>, AuthorizedUserFile)> {
    let malformed = |reason: String| AuthError::CredentialFileMalformed {
        path: path.to_path_buf(),
        reason,
    };

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AuthError::CredentialFileMissing(path.to_path_buf()));
        }
        Err(e) => return Err(malformed(e.to_string())),
    };

    let document: Map<String, Value> =
        serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;
    let credentials: AuthorizedUserFile = serde_json::from_value(Value::Object(document.clone()))
        .map_err(|e| malformed(e.to_string()))?;

    Ok((document, credentials))
}

/// Store refreshed tokens under the canonical keys, keeping every other field
async fn write_back(
    path: &Path,
    mut document: Map<String, Value>,
    tokens: &OAuthTokens,
) -> std::io::Result<()> {
    document.remove("access_token");
    document.remove("expires_at");
    document.insert("token".to_string(), Value::String(tokens.access_token.clone()));
    if let Some(refresh_token) = &tokens.refresh_token {
        document.insert(
            "refresh_token".to_string(),
            Value::String(refresh_token.clone()),
        );
    }
    if let Some(expires_at) = tokens.expires_at {
        document.insert(
            "expiry".to_string(),
            Value::String(expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }

    let text = serde_json::to_string_pretty(&Value::Object(document)).map_err(std::io::Error::other)?;

    let staging = staging_path(path);
    tokio::fs::write(&staging, text).await?;
    tokio::fs::rename(&staging, path).await
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
