//! Access tokens that stay valid for the whole run
//!
//! Google access tokens live for about an hour, while pulling a large
//! folder can take far longer. [`SessionManager`] hands out the current
//! token and refreshes it once it comes within [`EXPIRY_BUFFER_SECS`] of
//! expiring.

use crate::error::{AuthError, Result};
use crate::session::{Renewal, Session, EXPIRY_BUFFER_SECS};
use async_trait::async_trait;
use bridge_traits::time::Clock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Supplies a bearer token for each API call
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A token that is valid right now
    async fn access_token(&self) -> Result<String>;
}

/// A token that never changes
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self(access_token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct ManagedState {
    session: Session,
    renewal: Option<Renewal>,
}

/// Keeps an established session's token fresh
///
/// Concurrent callers wait on one refresh instead of each starting their own.
pub struct SessionManager {
    state: Mutex<ManagedState>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub(crate) fn new(session: Session, renewal: Option<Renewal>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(ManagedState { session, renewal }),
            clock,
        }
    }

    /// Snapshot of the session as it stands
    pub async fn session(&self) -> Session {
        self.state.lock().await.session.clone()
    }

    /// Return the current token, refreshing it first when it is about to expire.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] if the token expired and the credential
    ///   file had no refresh token
    /// - [`AuthError::TokenRefreshFailed`] if the token endpoint refused
    #[instrument(skip(self))]
    pub async fn get_valid_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if !state
            .session
            .is_expiring(self.clock.now(), EXPIRY_BUFFER_SECS)
        {
            debug!("Token is valid, no refresh needed");
            return Ok(state.session.access_token().to_string());
        }

        info!("Token expired or expiring soon, refreshing");
        let renewal = state.renewal.as_mut().ok_or(AuthError::TokenExpired)?;
        let session = renewal.renew().await?;
        info!(expires_at = ?session.expires_at(), "Access token refreshed");

        state.session = session;
        Ok(state.session.access_token().to_string())
    }
}

#[async_trait]
impl AccessTokenSource for SessionManager {
    async fn access_token(&self) -> Result<String> {
        self.get_valid_token().await
    }
}
