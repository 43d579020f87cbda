//! engine
//!
//! Orchestrates a deploy: Edit -> Upload -> Track -> Validate or Commit.
//!
//! # Architecture
//!
//! The engine drives a [`Publisher`](crate::publisher::Publisher) through
//! one edit:
//!
//! 1. **Edit**: open a new edit and print the current tracks
//! 2. **Upload**: upload every artifact with its expansion, mapping and
//!    symbol files, collecting version codes
//! 3. **Track**: merge the version codes into the target track
//! 4. **Finish**: validate the edit on a dry run, otherwise commit it
//!
//! # Recovery
//!
//! - A commit (or a dry-run validation) refused because the changes cannot
//!   be sent for review is followed by one commit without sending them for
//!   review, when configured to.
//! - Every other failure stops the run. Known failure signatures carry an
//!   operator hint (see [`DeployError::hint`]).
//!
//! The edit is left open on failure; the service discards abandoned edits.

pub mod run;
pub mod track;
pub mod upload;

pub use run::{deploy, DeployReport, Outcome};

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;
use crate::core::release_notes::ReleaseNotesError;
use crate::publisher::PublisherError;

/// Errors from a deploy run.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    ReleaseNotes(#[from] ReleaseNotesError),

    #[error("failed to read {what} '{path}': {source}")]
    ReadFile {
        what: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to {operation}: {source}")]
    Publisher {
        operation: &'static str,
        source: PublisherError,
    },
}

impl DeployError {
    /// Wrap a publisher error with the operation that failed.
    pub fn publisher(operation: &'static str) -> impl FnOnce(PublisherError) -> Self {
        move |source| DeployError::Publisher { operation, source }
    }

    /// Suggestion for the operator, for failures with a known remedy.
    pub fn hint(&self) -> Option<&'static str> {
        let DeployError::Publisher { source, .. } = self else {
            return None;
        };
        if source.is_bundle_installation_warning() {
            Some(
                "set ack_bundle_installation_warning to true to acknowledge the app bundle \
                 installation size warning",
            )
        } else if source.is_review_refusal() {
            Some(
                "set retry_without_sending_to_review to true to commit the changes without \
                 sending them for review",
            )
        } else if source.is_internal_error() {
            Some(
                "the publishing service failed with an internal error; this often happens on \
                 the first upload of an app, try uploading the artifact manually in the Play \
                 Console once",
            )
        } else {
            None
        }
    }
}
