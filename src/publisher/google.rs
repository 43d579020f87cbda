//! publisher::google
//!
//! Google Play implementation using the Android Publisher v3 REST API.
//!
//! # Design
//!
//! Metadata calls go to the API base (`/androidpublisher/v3/...`); binary
//! uploads go to the upload base (`/upload/androidpublisher/v3/...`) as
//! `uploadType=media` requests whose body is the raw file.
//!
//! # Retries
//!
//! Every request is retried on:
//! - 401, after invalidating the cached access token
//! - 429 and 5xx responses
//! - network errors
//!
//! with a fixed wait between attempts. Other failures return immediately.
//!
//! # Example
//!
//! ```ignore
//! use play_deploy::auth::ServiceAccountAuth;
//! use play_deploy::publisher::google::GooglePlayPublisher;
//! use std::sync::Arc;
//!
//! let auth = Arc::new(ServiceAccountAuth::new(key, client.clone()));
//! let publisher = GooglePlayPublisher::new(client, auth, "com.example.app");
//! let edit = publisher.insert_edit().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use super::traits::{AppEdit, DeobfuscationKind, Publisher, PublisherError, UploadedArtifact};
use crate::auth::TokenProvider;
use crate::core::inputs::ExpansionSlot;
use crate::core::types::{Track, VersionCode};

/// Default API host.
pub const DEFAULT_HOST: &str = "https://androidpublisher.googleapis.com";

const API_PATH: &str = "androidpublisher/v3";
const UPLOAD_PATH: &str = "upload/androidpublisher/v3";

const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// How failed requests are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait between attempts
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            wait: Duration::from_secs(2),
        }
    }
}

/// Google Play publisher.
pub struct GooglePlayPublisher {
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
    package_name: String,
    api_base: String,
    upload_base: String,
    retry: RetryPolicy,
}

// Custom Debug to keep the token provider out of logs
impl std::fmt::Debug for GooglePlayPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePlayPublisher")
            .field("account", &self.token_provider.account())
            .field("package_name", &self.package_name)
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GooglePlayPublisher {
    /// Create a publisher for `package_name` against the public API.
    pub fn new(
        client: Client,
        token_provider: Arc<dyn TokenProvider>,
        package_name: impl Into<String>,
    ) -> Self {
        Self::with_host(client, token_provider, package_name, DEFAULT_HOST)
    }

    /// Create a publisher against a custom host (for testing).
    pub fn with_host(
        client: Client,
        token_provider: Arc<dyn TokenProvider>,
        package_name: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        let host = host.into();
        let host = host.trim_end_matches('/');
        Self {
            client,
            token_provider,
            package_name: package_name.into(),
            api_base: format!("{}/{}", host, API_PATH),
            upload_base: format!("{}/{}", host, UPLOAD_PATH),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of an edits endpoint. `path` starts with `/` or `:` or is empty.
    fn edits_url(&self, path: &str) -> String {
        format!(
            "{}/applications/{}/edits{}",
            self.api_base, self.package_name, path
        )
    }

    /// URL of one track within an edit, with the track name as an encoded
    /// path segment.
    fn track_url(&self, edit_id: &str, track: &str) -> Result<Url, PublisherError> {
        let base = self.edits_url(&format!("/{}/tracks", edit_id));
        let mut url = Url::parse(&base)
            .map_err(|e| PublisherError::InvalidResponse(format!("invalid URL '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| PublisherError::InvalidResponse(format!("invalid URL '{}'", base)))?
            .push(track);
        Ok(url)
    }

    /// URL of an upload endpoint within an edit.
    fn upload_url(&self, edit_id: &str, path: &str) -> String {
        format!(
            "{}/applications/{}/edits/{}/{}",
            self.upload_base, self.package_name, edit_id, path
        )
    }

    async fn bearer_token(&self) -> Result<String, PublisherError> {
        self.token_provider.bearer_token().await.map_err(|e| {
            if e.is_transient() {
                PublisherError::Network(e.to_string())
            } else {
                PublisherError::Credentials(e.to_string())
            }
        })
    }

    /// Send the request built by `build`, retrying per the policy.
    async fn execute<T, F>(&self, operation: &str, build: F) -> Result<T, PublisherError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match self.execute_once(&build).await {
                Err(err) if err.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    if matches!(err, PublisherError::AuthFailed(_)) {
                        self.token_provider.invalidate();
                    }
                    tracing::warn!(operation, attempt, error = %err, "request failed, retrying");
                    tokio::time::sleep(self.retry.wait).await;
                }
                result => return result,
            }
        }
    }

    async fn execute_once<T, F>(&self, build: &F) -> Result<T, PublisherError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let token = self.bearer_token().await?;
        let response = build()
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PublisherError::Network(e.to_string()))?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, PublisherError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublisherError::Network(e.to_string()))?;

        if status.is_success() {
            let body = if body.trim().is_empty() { "null" } else { &body };
            serde_json::from_str(body).map_err(|e| {
                PublisherError::InvalidResponse(format!("failed to parse response: {}", e))
            })
        } else {
            Err(Self::error_from(status, &body))
        }
    }

    /// Map an error response to a [`PublisherError`].
    fn error_from(status: StatusCode, body: &str) -> PublisherError {
        let message = serde_json::from_str::<GoogleErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match status {
            StatusCode::UNAUTHORIZED => PublisherError::AuthFailed(message),
            StatusCode::NOT_FOUND => PublisherError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => PublisherError::RateLimited,
            _ => PublisherError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn upload(&self, url: &str, content_type: &'static str, content: &Bytes) -> RequestBuilder {
        self.client
            .post(url)
            .query(&[("uploadType", "media")])
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
            .body(content.clone())
    }
}

#[async_trait]
impl Publisher for GooglePlayPublisher {
    fn name(&self) -> &'static str {
        "google-play"
    }

    fn package_name(&self) -> &str {
        &self.package_name
    }

    async fn insert_edit(&self) -> Result<AppEdit, PublisherError> {
        let url = self.edits_url("");
        self.execute("insert edit", || {
            self.client.post(&url).json(&serde_json::json!({}))
        })
        .await
    }

    async fn list_tracks(&self, edit_id: &str) -> Result<Vec<Track>, PublisherError> {
        let url = self.edits_url(&format!("/{}/tracks", edit_id));
        let response: TracksListResponse =
            self.execute("list tracks", || self.client.get(&url)).await?;
        Ok(response.tracks)
    }

    async fn update_track(&self, edit_id: &str, track: &Track) -> Result<Track, PublisherError> {
        let url = self.track_url(edit_id, &track.name)?;
        self.execute("update track", || self.client.put(url.clone()).json(track))
            .await
    }

    async fn upload_apk(
        &self,
        edit_id: &str,
        content: Bytes,
    ) -> Result<UploadedArtifact, PublisherError> {
        let url = self.upload_url(edit_id, "apks");
        let apk: ApkResponse = self
            .execute("upload apk", || {
                self.upload(&url, APK_CONTENT_TYPE, &content)
            })
            .await?;
        Ok(UploadedArtifact {
            version_code: apk.version_code,
            sha256: apk.binary.and_then(|b| b.sha256),
        })
    }

    async fn upload_bundle(
        &self,
        edit_id: &str,
        content: Bytes,
        ack_bundle_installation_warning: bool,
    ) -> Result<UploadedArtifact, PublisherError> {
        let url = self.upload_url(edit_id, "bundles");
        let ack = ack_bundle_installation_warning.to_string();
        let bundle: BundleResponse = self
            .execute("upload bundle", || {
                self.upload(&url, BINARY_CONTENT_TYPE, &content)
                    .query(&[("ackBundleInstallationWarning", ack.as_str())])
            })
            .await?;
        Ok(UploadedArtifact {
            version_code: bundle.version_code,
            sha256: bundle.sha256,
        })
    }

    async fn upload_expansion_file(
        &self,
        edit_id: &str,
        version_code: VersionCode,
        slot: ExpansionSlot,
        content: Bytes,
    ) -> Result<(), PublisherError> {
        let url = self.upload_url(
            edit_id,
            &format!("apks/{}/expansionFiles/{}", version_code, slot.as_str()),
        );
        let _: IgnoredAny = self
            .execute("upload expansion file", || {
                self.upload(&url, BINARY_CONTENT_TYPE, &content)
            })
            .await?;
        Ok(())
    }

    async fn upload_deobfuscation_file(
        &self,
        edit_id: &str,
        version_code: VersionCode,
        kind: DeobfuscationKind,
        content: Bytes,
    ) -> Result<(), PublisherError> {
        let url = self.upload_url(
            edit_id,
            &format!("apks/{}/deobfuscationFiles/{}", version_code, kind.as_str()),
        );
        let _: IgnoredAny = self
            .execute("upload deobfuscation file", || {
                self.upload(&url, BINARY_CONTENT_TYPE, &content)
            })
            .await?;
        Ok(())
    }

    async fn validate_edit(&self, edit_id: &str) -> Result<AppEdit, PublisherError> {
        let url = self.edits_url(&format!("/{}:validate", edit_id));
        self.execute("validate edit", || self.client.post(&url))
            .await
    }

    async fn commit_edit(
        &self,
        edit_id: &str,
        changes_not_sent_for_review: bool,
    ) -> Result<AppEdit, PublisherError> {
        let url = self.edits_url(&format!("/{}:commit", edit_id));
        self.execute("commit edit", || {
            let request = self.client.post(&url);
            if changes_not_sent_for_review {
                request.query(&[("changesNotSentForReview", "true")])
            } else {
                request
            }
        })
        .await
    }
}

// Wire types

#[derive(Deserialize)]
struct GoogleErrorResponse {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
}

#[derive(Deserialize)]
struct TracksListResponse {
    #[serde(default)]
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApkResponse {
    version_code: VersionCode,
    #[serde(default)]
    binary: Option<ApkBinary>,
}

#[derive(Deserialize)]
struct ApkBinary {
    #[serde(default)]
    sha256: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleResponse {
    version_code: VersionCode,
    #[serde(default)]
    sha256: Option<String>,
}
