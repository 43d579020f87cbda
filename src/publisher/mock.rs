//! publisher::mock
//!
//! Mock publisher implementation for deterministic testing.
//!
//! # Design
//!
//! The mock keeps committed tracks in memory and models edits: inserting an
//! edit snapshots the committed tracks, track updates change only that
//! snapshot, and committing replaces the committed tracks with it. Uploads
//! are assigned version codes from a configurable queue, falling back to an
//! increasing counter. Any operation can be configured to fail.
//!
//! # Example
//!
//! ```
//! use play_deploy::publisher::mock::MockPublisher;
//! use play_deploy::publisher::Publisher;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let publisher = MockPublisher::new("com.example.app").with_version_codes(vec![42]);
//!
//! let edit = publisher.insert_edit().await.unwrap();
//! let apk = publisher.upload_apk(&edit.id, "apk".into()).await.unwrap();
//! assert_eq!(apk.version_code, 42);
//!
//! publisher.commit_edit(&edit.id, false).await.unwrap();
//! assert_eq!(publisher.operations().len(), 3);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::traits::{AppEdit, DeobfuscationKind, Publisher, PublisherError, UploadedArtifact};
use crate::core::inputs::ExpansionSlot;
use crate::core::types::{Track, VersionCode};

/// Mock publisher for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockPublisher {
    package_name: String,
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockPublisherInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockPublisherInner {
    /// Tracks as of the last commit.
    committed: BTreeMap<String, Track>,
    /// Open edits by id, each holding its own view of the tracks.
    edits: HashMap<String, BTreeMap<String, Track>>,
    next_edit_id: u64,
    /// Version codes handed out to uploads before the counter is used.
    queued_version_codes: VecDeque<VersionCode>,
    next_version_code: VersionCode,
    /// Operations to fail (for testing error paths).
    fail_on: Vec<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    InsertEdit(PublisherError),
    ListTracks(PublisherError),
    UpdateTrack(PublisherError),
    UploadApk(PublisherError),
    /// Fail bundle uploads in every case.
    UploadBundle(PublisherError),
    /// Fail bundle uploads that do not acknowledge the installation warning.
    UploadBundleWithoutAck(PublisherError),
    UploadExpansionFile(PublisherError),
    UploadDeobfuscationFile(PublisherError),
    ValidateEdit(PublisherError),
    /// Fail every commit.
    CommitEdit(PublisherError),
    /// Fail commits that would send changes for review.
    CommitSentForReview(PublisherError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOperation {
    InsertEdit {
        edit_id: String,
    },
    ListTracks {
        edit_id: String,
    },
    UpdateTrack {
        edit_id: String,
        track: Track,
    },
    UploadApk {
        edit_id: String,
        size: usize,
    },
    UploadBundle {
        edit_id: String,
        size: usize,
        ack_bundle_installation_warning: bool,
    },
    UploadExpansionFile {
        edit_id: String,
        version_code: VersionCode,
        slot: ExpansionSlot,
    },
    UploadDeobfuscationFile {
        edit_id: String,
        version_code: VersionCode,
        kind: DeobfuscationKind,
    },
    ValidateEdit {
        edit_id: String,
    },
    CommitEdit {
        edit_id: String,
        changes_not_sent_for_review: bool,
    },
}

impl MockPublisher {
    /// Create a mock publisher with no tracks.
    pub fn new(package_name: impl Into<String>) -> Self {
        Self::with_tracks(package_name, Vec::new())
    }

    /// Create a mock publisher with pre-existing committed tracks.
    pub fn with_tracks(package_name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            package_name: package_name.into(),
            inner: Arc::new(Mutex::new(MockPublisherInner {
                committed: tracks.into_iter().map(|t| (t.name.clone(), t)).collect(),
                edits: HashMap::new(),
                next_edit_id: 1,
                queued_version_codes: VecDeque::new(),
                next_version_code: 1,
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Hand out these version codes to the next uploads, in order.
    pub fn with_version_codes(self, codes: Vec<VersionCode>) -> Self {
        self.inner.lock().unwrap().queued_version_codes.extend(codes);
        self
    }

    /// Configure the mock to fail an operation.
    ///
    /// Can be called several times to fail several operations.
    ///
    /// # Example
    ///
    /// ```
    /// use play_deploy::publisher::mock::{FailOn, MockPublisher};
    /// use play_deploy::publisher::PublisherError;
    ///
    /// let publisher = MockPublisher::new("com.example.app")
    ///     .fail_on(FailOn::ValidateEdit(PublisherError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().unwrap().fail_on.push(fail_on);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Get a committed track by name (for test verification).
    pub fn committed_track(&self, name: &str) -> Option<Track> {
        self.inner.lock().unwrap().committed.get(name).cloned()
    }

    /// Number of edits still open.
    pub fn open_edits(&self) -> usize {
        self.inner.lock().unwrap().edits.len()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }

    /// Return the configured error for an operation, if any.
    fn check_fail(&self, matches: impl Fn(&FailOn) -> Option<&PublisherError>) -> Result<(), PublisherError> {
        let inner = self.inner.lock().unwrap();
        match inner.fail_on.iter().find_map(matches) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_edit(inner: &MockPublisherInner, edit_id: &str) -> Result<(), PublisherError> {
        if inner.edits.contains_key(edit_id) {
            Ok(())
        } else {
            Err(PublisherError::NotFound(format!("edit {}", edit_id)))
        }
    }

    fn assign_version_code(&self, edit_id: &str) -> Result<VersionCode, PublisherError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_edit(&inner, edit_id)?;
        Ok(match inner.queued_version_codes.pop_front() {
            Some(code) => code,
            None => {
                let code = inner.next_version_code;
                inner.next_version_code += 1;
                code
            }
        })
    }

    fn edit(&self, edit_id: &str) -> Result<AppEdit, PublisherError> {
        let inner = self.inner.lock().unwrap();
        Self::require_edit(&inner, edit_id)?;
        Ok(AppEdit {
            id: edit_id.to_string(),
            expiry_time_seconds: None,
        })
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn package_name(&self) -> &str {
        &self.package_name
    }

    async fn insert_edit(&self) -> Result<AppEdit, PublisherError> {
        self.check_fail(|f| match f {
            FailOn::InsertEdit(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_edit_id.to_string();
        inner.next_edit_id += 1;
        let snapshot = inner.committed.clone();
        inner.edits.insert(id.clone(), snapshot);
        inner.operations.push(MockOperation::InsertEdit {
            edit_id: id.clone(),
        });

        Ok(AppEdit {
            id,
            expiry_time_seconds: None,
        })
    }

    async fn list_tracks(&self, edit_id: &str) -> Result<Vec<Track>, PublisherError> {
        self.record(MockOperation::ListTracks {
            edit_id: edit_id.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::ListTracks(e) => Some(e),
            _ => None,
        })?;

        let inner = self.inner.lock().unwrap();
        Self::require_edit(&inner, edit_id)?;
        Ok(inner.edits[edit_id].values().cloned().collect())
    }

    async fn update_track(&self, edit_id: &str, track: &Track) -> Result<Track, PublisherError> {
        self.record(MockOperation::UpdateTrack {
            edit_id: edit_id.to_string(),
            track: track.clone(),
        });
        self.check_fail(|f| match f {
            FailOn::UpdateTrack(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        let tracks = inner
            .edits
            .get_mut(edit_id)
            .ok_or_else(|| PublisherError::NotFound(format!("edit {}", edit_id)))?;
        tracks.insert(track.name.clone(), track.clone());
        Ok(track.clone())
    }

    async fn upload_apk(
        &self,
        edit_id: &str,
        content: Bytes,
    ) -> Result<UploadedArtifact, PublisherError> {
        self.record(MockOperation::UploadApk {
            edit_id: edit_id.to_string(),
            size: content.len(),
        });
        self.check_fail(|f| match f {
            FailOn::UploadApk(e) => Some(e),
            _ => None,
        })?;

        Ok(UploadedArtifact {
            version_code: self.assign_version_code(edit_id)?,
            sha256: None,
        })
    }

    async fn upload_bundle(
        &self,
        edit_id: &str,
        content: Bytes,
        ack_bundle_installation_warning: bool,
    ) -> Result<UploadedArtifact, PublisherError> {
        self.record(MockOperation::UploadBundle {
            edit_id: edit_id.to_string(),
            size: content.len(),
            ack_bundle_installation_warning,
        });
        self.check_fail(|f| match f {
            FailOn::UploadBundle(e) => Some(e),
            FailOn::UploadBundleWithoutAck(e) if !ack_bundle_installation_warning => Some(e),
            _ => None,
        })?;

        Ok(UploadedArtifact {
            version_code: self.assign_version_code(edit_id)?,
            sha256: None,
        })
    }

    async fn upload_expansion_file(
        &self,
        edit_id: &str,
        version_code: VersionCode,
        slot: ExpansionSlot,
        _content: Bytes,
    ) -> Result<(), PublisherError> {
        self.record(MockOperation::UploadExpansionFile {
            edit_id: edit_id.to_string(),
            version_code,
            slot,
        });
        self.check_fail(|f| match f {
            FailOn::UploadExpansionFile(e) => Some(e),
            _ => None,
        })?;
        self.edit(edit_id).map(|_| ())
    }

    async fn upload_deobfuscation_file(
        &self,
        edit_id: &str,
        version_code: VersionCode,
        kind: DeobfuscationKind,
        _content: Bytes,
    ) -> Result<(), PublisherError> {
        self.record(MockOperation::UploadDeobfuscationFile {
            edit_id: edit_id.to_string(),
            version_code,
            kind,
        });
        self.check_fail(|f| match f {
            FailOn::UploadDeobfuscationFile(e) => Some(e),
            _ => None,
        })?;
        self.edit(edit_id).map(|_| ())
    }

    async fn validate_edit(&self, edit_id: &str) -> Result<AppEdit, PublisherError> {
        self.record(MockOperation::ValidateEdit {
            edit_id: edit_id.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::ValidateEdit(e) => Some(e),
            _ => None,
        })?;
        self.edit(edit_id)
    }

    async fn commit_edit(
        &self,
        edit_id: &str,
        changes_not_sent_for_review: bool,
    ) -> Result<AppEdit, PublisherError> {
        self.record(MockOperation::CommitEdit {
            edit_id: edit_id.to_string(),
            changes_not_sent_for_review,
        });
        self.check_fail(|f| match f {
            FailOn::CommitEdit(e) => Some(e),
            FailOn::CommitSentForReview(e) if !changes_not_sent_for_review => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        let tracks = inner
            .edits
            .remove(edit_id)
            .ok_or_else(|| PublisherError::NotFound(format!("edit {}", edit_id)))?;
        inner.committed = tracks;
        Ok(AppEdit {
            id: edit_id.to_string(),
            expiry_time_seconds: None,
        })
    }
}
