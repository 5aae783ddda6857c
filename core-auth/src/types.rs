use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth 2.0 token set.
///
/// Contains the access token, the optional refresh token, and the expiration
/// time for an authenticated session.
///
/// # Security
///
/// Tokens should never be logged. The `Debug` implementation redacts them.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let tokens = OAuthTokens {
///     access_token: "ya29.a0...".to_string(),
///     refresh_token: Some("1//0g...".to_string()),
///     expires_at: Some(now + Duration::hours(1)),
/// };
///
/// assert!(!tokens.is_expired_with_buffer(now, 60));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC); unknown when absent
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthTokens {
    /// Create a token set expiring `expires_in` seconds after `now`
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        now: DateTime<Utc>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Some(now + chrono::Duration::seconds(expires_in)),
        }
    }

    /// Check if the access token is expired or will expire within the buffer
    ///
    /// A token with no recorded expiry is treated as valid; the account probe
    /// catches a token the server no longer accepts.
    pub fn is_expired_with_buffer(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at - chrono::Duration::seconds(buffer_seconds),
            None => false,
        }
    }

    /// Get the time remaining until token expiration
    ///
    /// Returns `None` if the token is already expired or the expiry is unknown.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let expires_at = self.expires_at?;
        if now >= expires_at {
            None
        } else {
            Some(expires_at - now)
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Expiry as written by the various Google client libraries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpiryValue {
    /// RFC 3339 text, with or without a zone suffix (UTC assumed)
    Text(String),
    /// Unix timestamp in seconds
    Unix(i64),
}

impl ExpiryValue {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            ExpiryValue::Text(text) => parse_expiry_text(text),
            ExpiryValue::Unix(seconds) => DateTime::from_timestamp(*seconds, 0),
        }
    }
}

fn parse_expiry_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Stored "authorized user" credential file.
///
/// The shape written by Google's OAuth client libraries. `access_token` and
/// `expires_at` are accepted as aliases for `token` and `expiry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizedUserFile {
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, alias = "expires_at")]
    pub expiry: Option<ExpiryValue>,
}

impl AuthorizedUserFile {
    /// Token set held by the file, if it has an access token
    pub fn tokens(&self) -> Option<OAuthTokens> {
        let access_token = self.token.clone().filter(|t| !t.is_empty())?;
        Some(OAuthTokens {
            access_token,
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expiry.as_ref().and_then(ExpiryValue::to_datetime),
        })
    }

    /// Whether the file carries enough to ask for a new access token
    pub fn can_refresh(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.refresh_token) && present(&self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_tokens_expiry_buffer() {
        let now = instant();
        let tokens = OAuthTokens::new("a".to_string(), None, now, 30);
        assert!(tokens.is_expired_with_buffer(now, 60));
        assert!(!tokens.is_expired_with_buffer(now, 10));
        assert_eq!(tokens.time_until_expiry(now), Some(Duration::seconds(30)));
    }

    #[test]
    fn test_unknown_expiry_is_not_expired() {
        let tokens = OAuthTokens {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        assert!(!tokens.is_expired_with_buffer(instant(), 60));
        assert!(tokens.time_until_expiry(instant()).is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let tokens = OAuthTokens::new(
            "ya29.secret".to_string(),
            Some("1//refresh".to_string()),
            instant(),
            3600,
        );
        let debug = format!("{:?}", tokens);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("ya29.secret"));
        assert!(!debug.contains("1//refresh"));
    }

    #[test]
    fn test_parse_google_authorized_user_file() {
        let json = r#"{
            "token": "ya29.a0",
            "refresh_token": "1//0g",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "client.apps.googleusercontent.com",
            "client_secret": "shh",
            "scopes": ["https://www.googleapis.com/auth/drive"],
            "universe_domain": "googleapis.com",
            "expiry": "2024-05-01T13:00:00.123456Z"
        }"#;

        let file: AuthorizedUserFile = serde_json::from_str(json).unwrap();
        assert!(file.can_refresh());
        assert_eq!(file.scopes.len(), 1);

        let tokens = file.tokens().unwrap();
        assert_eq!(tokens.access_token, "ya29.a0");
        assert_eq!(
            tokens.expires_at.unwrap().timestamp(),
            instant().timestamp() + 3600
        );
    }

    #[test]
    fn test_parse_aliases_and_unix_expiry() {
        let json = r#"{"access_token": "abc", "expires_at": 1714568400}"#;
        let file: AuthorizedUserFile = serde_json::from_str(json).unwrap();

        assert!(!file.can_refresh());
        let tokens = file.tokens().unwrap();
        assert_eq!(tokens.access_token, "abc");
        assert_eq!(tokens.expires_at.unwrap().timestamp(), 1714568400);
    }

    #[test]
    fn test_expiry_without_zone_is_utc() {
        let expiry = ExpiryValue::Text("2024-05-01T12:00:00".to_string());
        assert_eq!(expiry.to_datetime(), Some(instant()));
        assert!(ExpiryValue::Text("tomorrow".to_string())
            .to_datetime()
            .is_none());
    }

    #[test]
    fn test_missing_token_yields_no_tokens() {
        let file: AuthorizedUserFile =
            serde_json::from_str(r#"{"refresh_token": "r", "client_id": "c"}"#).unwrap();
        assert!(file.tokens().is_none());
        assert!(file.can_refresh());
    }
}
