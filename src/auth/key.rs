//! auth::key
//!
//! Service-account key loading.
//!
//! Keys are JSON documents as downloaded from the cloud console. Only the
//! fields needed to mint access tokens are read; the rest is ignored. A key
//! is read from disk or downloaded over HTTP(S), with a few retries for the
//! latter.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::errors::AuthError;
use crate::core::config::KeySource;

/// Token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Retries after a failed key download.
pub const REMOTE_KEY_RETRIES: u32 = 3;

/// Wait between key download attempts.
pub const REMOTE_KEY_RETRY_WAIT: Duration = Duration::from_secs(3);

/// A service-account key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Account identity, used as the JWT issuer
    pub client_email: String,
    /// PKCS#8 PEM private key
    pub private_key: String,
    /// Key id, sent as the JWT `kid`
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        if key.client_email.trim().is_empty() {
            return Err(AuthError::InvalidKey("client_email is empty".to_string()));
        }
        if key.private_key.trim().is_empty() {
            return Err(AuthError::InvalidKey("private_key is empty".to_string()));
        }
        Ok(key)
    }

    /// Token endpoint for this key.
    pub fn token_uri(&self) -> &str {
        self.token_uri
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Load a key from its configured source.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyRead`] if a local file cannot be read
    /// - [`AuthError::KeyDownload`] if every download attempt fails
    /// - [`AuthError::InvalidKey`] if the content is not a usable key
    pub async fn load(source: &KeySource, client: &Client) -> Result<Self, AuthError> {
        let json = match source {
            KeySource::Local(path) => {
                tracing::debug!(path = %path.display(), "reading service account key");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| AuthError::KeyRead {
                        path: path.clone(),
                        message: e.to_string(),
                    })?
            }
            KeySource::Remote(url) => {
                download(client, url, REMOTE_KEY_RETRIES, REMOTE_KEY_RETRY_WAIT).await?
            }
        };
        Self::from_json(&json)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Download a key, retrying `retries` times with a fixed wait.
pub async fn download(
    client: &Client,
    url: &str,
    retries: u32,
    wait: Duration,
) -> Result<String, AuthError> {
    let mut attempt = 0;
    loop {
        match download_once(client, url).await {
            Ok(body) => return Ok(body),
            Err(err) if attempt < retries => {
                attempt += 1;
                tracing::warn!(attempt, error = %err, "service account key download failed, retrying");
                tokio::time::sleep(wait).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn download_once(client: &Client, url: &str) -> Result<String, AuthError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AuthError::KeyDownload(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::KeyDownload(format!(
            "server responded with {}",
            status.as_u16()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| AuthError::KeyDownload(e.to_string()))
}
