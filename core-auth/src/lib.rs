//! # Authentication Module
//!
//! Establishes an authenticated Google Drive session from a stored
//! credential file.
//!
//! ## Overview
//!
//! The operator authorizes once with any Google OAuth client library, which
//! leaves an "authorized user" JSON file behind. This crate reads that file,
//! refreshes the access token when needed, and hands out a [`Session`].
//!
//! ## Features
//!
//! - Accepts the Google `authorized_user` schema plus common aliases
//! - Refreshes expired tokens through the injected `HttpClient`
//! - Writes refreshed tokens back to the file (best effort)
//! - Keeps the token fresh for long runs through [`SessionManager`]
//! - Redacts tokens from all `Debug` output

pub mod error;
pub mod manager;
pub mod oauth;
pub mod session;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::{AccessTokenSource, SessionManager, StaticToken};
pub use oauth::{OAuthConfig, TokenRefresher, GOOGLE_TOKEN_URL};
pub use session::{Session, SessionEstablisher};
pub use types::{AuthorizedUserFile, ExpiryValue, OAuthTokens};
