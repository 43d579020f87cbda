//! auth::errors
//!
//! Authentication error types for service-account access.
//!
//! # Design
//!
//! Error messages never contain the private key or access tokens. Server
//! responses are reduced to their error description before being wrapped.
//!
//! # Example
//!
//! ```
//! use play_deploy::auth::AuthError;
//!
//! let err = AuthError::InvalidKey("missing field `client_email`".to_string());
//! assert!(err.to_string().contains("client_email"));
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Errors from authentication operations.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// A local key file could not be read.
    #[error("failed to read service account key '{path}': {message}")]
    KeyRead { path: PathBuf, message: String },

    /// A remote key could not be downloaded.
    #[error("failed to download service account key: {0}")]
    KeyDownload(String),

    /// The key JSON is malformed or incomplete.
    #[error("invalid service account key: {0}")]
    InvalidKey(String),

    /// The JWT assertion could not be signed.
    #[error("failed to sign token request: {0}")]
    Signing(String),

    /// The token endpoint refused the assertion.
    #[error("token exchange failed: {status} - {message}")]
    TokenExchange {
        /// HTTP status code
        status: u16,
        /// Error description from the token endpoint
        message: String,
    },

    /// Network error during authentication.
    #[error("network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Check if this error indicates a transient failure that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Network(_) | AuthError::KeyDownload(_) => true,
            AuthError::TokenExchange { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}
