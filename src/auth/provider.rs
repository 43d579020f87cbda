//! auth::provider
//!
//! ServiceAccountAuth - TokenProvider implementation for service accounts.
//!
//! # Token lifecycle
//!
//! 1. On first use, sign a JWT assertion with the account's private key
//! 2. Exchange it at the key's token endpoint for an access token
//! 3. Cache the token until 60 seconds before it expires
//! 4. After [`TokenProvider::invalidate`], mint a fresh one on next use
//!
//! # Example
//!
//! ```ignore
//! use play_deploy::auth::{ServiceAccountAuth, ServiceAccountKey, TokenProvider};
//!
//! let key = ServiceAccountKey::load(&source, &client).await?;
//! let auth = ServiceAccountAuth::new(key, client);
//! let token = auth.bearer_token().await?;
//! ```

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::errors::AuthError;
use super::jwt::build_assertion;
use super::key::ServiceAccountKey;
use super::TokenProvider;

/// OAuth scope of the publishing API.
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

/// Refresh this many seconds before the token expires.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) < self.expires_at
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Service-account authentication.
///
/// Implements [`TokenProvider`] for the publishing API client.
pub struct ServiceAccountAuth {
    client: Client,
    key: ServiceAccountKey,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Create a provider for the publishing API scope.
    pub fn new(key: ServiceAccountKey, client: Client) -> Self {
        Self::with_scope(key, client, ANDROID_PUBLISHER_SCOPE)
    }

    /// Create a provider for a custom scope.
    pub fn with_scope(key: ServiceAccountKey, client: Client, scope: &str) -> Self {
        Self {
            client,
            key,
            scope: scope.to_string(),
            cache: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<CachedToken> {
        self.cache.lock().ok().and_then(|c| c.clone())
    }

    fn store(&self, token: CachedToken) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(token);
        }
    }

    /// Exchange a fresh assertion for an access token.
    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let now = Utc::now();
        let assertion = build_assertion(&self.key, &self.scope, now)?;
        let request = TokenRequest {
            grant_type: JWT_BEARER_GRANT,
            assertion: &assertion,
        };

        tracing::debug!(account = %self.key.client_email, "requesting access token");
        let response = self
            .client
            .post(self.key.token_uri())
            .form(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                AuthError::TokenExchange {
                    status: status.as_u16(),
                    message: format!("unexpected token response: {}", e),
                }
            })?;
            return Ok(CachedToken {
                access_token: token.access_token,
                expires_at: now + Duration::seconds(token.expires_in),
            });
        }

        let message = match serde_json::from_str::<OAuthError>(&body) {
            Ok(err) => match err.error_description {
                Some(desc) => format!("{}: {}", err.error, desc),
                None => err.error,
            },
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        Err(AuthError::TokenExchange {
            status: status.as_u16(),
            message,
        })
    }
}

impl fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("cache", &self.cached())
            .finish()
    }
}

#[async_trait::async_trait]
impl TokenProvider for ServiceAccountAuth {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cached().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.access_token);
        }

        let token = self.exchange().await?;
        self.store(token.clone());
        Ok(token.access_token)
    }

    fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    fn account(&self) -> &str {
        &self.key.client_email
    }
}
