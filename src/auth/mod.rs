//! auth - Service-account authentication for the publishing API
//!
//! # Architecture
//!
//! The auth system:
//! - Loads a service-account key from disk or over HTTP(S)
//! - Signs RS256 JWT assertions with the account's private key
//! - Exchanges assertions for short-lived access tokens
//! - Caches tokens and refreshes them shortly before expiry
//! - Never exposes keys or tokens in logs, errors, or outputs
//!
//! # Components
//!
//! - [`ServiceAccountKey`] - Parsed key file
//! - [`TokenProvider`] - Trait for providing bearer tokens to API clients
//! - [`ServiceAccountAuth`] - Implementation of TokenProvider
//!
//! # Security
//!
//! Types holding the private key or an access token implement a custom
//! Debug that prints `[REDACTED]` in their place.

mod errors;
pub mod jwt;
pub mod key;
mod provider;

pub use errors::AuthError;
pub use key::{ServiceAccountKey, DEFAULT_TOKEN_URI};
pub use provider::{ServiceAccountAuth, ANDROID_PUBLISHER_SCOPE, EXPIRY_BUFFER_SECS};

/// Trait for providing bearer tokens to API clients.
///
/// # Implementation Notes
///
/// Implementors must:
/// - Handle token refresh transparently
/// - Drop any cached token on [`invalidate`](TokenProvider::invalidate)
/// - Never log or expose token values
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a valid bearer token, refreshing if necessary.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidKey`] if the key cannot sign
    /// - [`AuthError::TokenExchange`] if the token endpoint refuses
    /// - [`AuthError::Network`] on transport failures
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Forget the cached token so the next call mints a new one.
    ///
    /// Called after the API rejects a token with 401.
    fn invalidate(&self);

    /// Identity the tokens are issued for.
    fn account(&self) -> &str;
}
