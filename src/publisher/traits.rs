//! publisher::traits
//!
//! Publisher trait definition for the app publishing service.
//!
//! # Design
//!
//! Every change to a published app happens inside an *edit*: a server-side
//! transaction that is opened, modified, and then committed (or just
//! validated). All operations except [`Publisher::insert_edit`] are scoped
//! to an edit id. The trait is async because every operation is network
//! I/O; the deploy pipeline awaits them one at a time.
//!
//! # Example
//!
//! ```ignore
//! use play_deploy::publisher::Publisher;
//!
//! async fn dry_run(publisher: &dyn Publisher) -> Result<(), PublisherError> {
//!     let edit = publisher.insert_edit().await?;
//!     for track in publisher.list_tracks(&edit.id).await? {
//!         println!("{}", track.name);
//!     }
//!     publisher.validate_edit(&edit.id).await?;
//!     Ok(())
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::core::inputs::ExpansionSlot;
use crate::core::types::{Track, VersionCode};

/// Message fragment of the bundle-size warning that needs acknowledging.
pub const BUNDLE_INSTALLATION_WARNING: &str =
    "The installation of the app bundle may be too large and trigger user warning on some devices";

/// Message fragment of the refusal to send changes for review.
pub const REVIEW_REFUSAL: &str = "Changes cannot be sent for review automatically";

/// Message of the service's opaque internal failure.
pub const INTERNAL_ERROR: &str = "Internal error encountered";

/// Errors from publishing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublisherError {
    /// No usable credentials (the key or the token exchange failed).
    #[error("authentication required: {0}")]
    Credentials(String),

    /// The service rejected the access token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The service returned an error.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the service
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// A success response could not be understood.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl PublisherError {
    fn message(&self) -> &str {
        match self {
            PublisherError::Api { message, .. } => message,
            _ => "",
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PublisherError::AuthFailed(_)
            | PublisherError::RateLimited
            | PublisherError::Network(_) => true,
            PublisherError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The bundle upload needs `ackBundleInstallationWarning`.
    pub fn is_bundle_installation_warning(&self) -> bool {
        self.message().contains(BUNDLE_INSTALLATION_WARNING)
    }

    /// The commit was refused because changes cannot go to review automatically.
    pub fn is_review_refusal(&self) -> bool {
        self.message().contains(REVIEW_REFUSAL)
    }

    /// The service failed with its generic internal error.
    pub fn is_internal_error(&self) -> bool {
        matches!(self, PublisherError::Api { status: 500, message } if message.contains(INTERNAL_ERROR))
    }
}

/// A server-side edit transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEdit {
    /// Edit id
    pub id: String,
    /// Expiry as seconds since the epoch, as reported
    #[serde(default)]
    pub expiry_time_seconds: Option<String>,
}

/// Result of uploading an APK or bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    /// Version code the service read from the artifact
    pub version_code: VersionCode,
    /// SHA-256 of the uploaded binary, if reported
    pub sha256: Option<String>,
}

/// Type of a deobfuscation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeobfuscationKind {
    /// ProGuard/R8 mapping file
    Proguard,
    /// Native debug symbols archive
    NativeCode,
}

impl DeobfuscationKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeobfuscationKind::Proguard => "proguard",
            DeobfuscationKind::NativeCode => "nativeCode",
        }
    }
}

impl fmt::Display for DeobfuscationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The Publisher trait for interacting with the app publishing service.
///
/// A publisher is bound to one package.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// Implementations retry transient failures themselves. Errors that reach
/// the caller are final for that request.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Name of the implementation, for logs.
    fn name(&self) -> &'static str;

    /// Package the publisher operates on.
    fn package_name(&self) -> &str;

    /// Open a new edit.
    async fn insert_edit(&self) -> Result<AppEdit, PublisherError>;

    /// List the tracks as seen from the edit.
    async fn list_tracks(&self, edit_id: &str) -> Result<Vec<Track>, PublisherError>;

    /// Replace a track within the edit.
    async fn update_track(&self, edit_id: &str, track: &Track) -> Result<Track, PublisherError>;

    /// Upload an APK.
    async fn upload_apk(&self, edit_id: &str, content: Bytes)
        -> Result<UploadedArtifact, PublisherError>;

    /// Upload an app bundle.
    async fn upload_bundle(
        &self,
        edit_id: &str,
        content: Bytes,
        ack_bundle_installation_warning: bool,
    ) -> Result<UploadedArtifact, PublisherError>;

    /// Attach an expansion file to an uploaded APK.
    async fn upload_expansion_file(
        &self,
        edit_id: &str,
        version_code: VersionCode,
        slot: ExpansionSlot,
        content: Bytes,
    ) -> Result<(), PublisherError>;

    /// Attach a deobfuscation file to an uploaded artifact.
    async fn upload_deobfuscation_file(
        &self,
        edit_id: &str,
        version_code: VersionCode,
        kind: DeobfuscationKind,
        content: Bytes,
    ) -> Result<(), PublisherError>;

    /// Check the edit without applying it.
    async fn validate_edit(&self, edit_id: &str) -> Result<AppEdit, PublisherError>;

    /// Apply the edit.
    ///
    /// With `changes_not_sent_for_review` the changes are applied without
    /// being submitted for review.
    async fn commit_edit(
        &self,
        edit_id: &str,
        changes_not_sent_for_review: bool,
    ) -> Result<AppEdit, PublisherError>;
}
