//! core::types
//!
//! Domain types for tracks, releases and version codes.
//!
//! # Types
//!
//! - [`Track`] - A named distribution channel holding releases
//! - [`Release`] - A set of version codes with a status and optional rollout
//! - [`ReleaseStatus`] - Lifecycle state of a release
//! - [`LocalizedText`] - One language's release notes
//! - [`VersionCode`] - Integer build identifier of an uploaded artifact
//!
//! # Wire format
//!
//! These types double as the JSON representation used by the publishing
//! API. Version codes travel as decimal strings on the wire (int64 JSON
//! encoding) and are plain integers in memory. Fields the API returns that
//! are not modeled here are kept in `extra` so a read-modify-write of a
//! track does not drop them.
//!
//! # Example
//!
//! ```
//! use play_deploy::core::types::{Release, ReleaseStatus, Track};
//!
//! let json = r#"{"track":"beta","releases":[{"versionCodes":["41","42"],"status":"completed"}]}"#;
//! let track: Track = serde_json::from_str(json).unwrap();
//!
//! assert_eq!(track.name, "beta");
//! assert_eq!(track.releases[0].version_codes, vec![41, 42]);
//! assert_eq!(track.releases[0].status, ReleaseStatus::Completed);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Integer build identifier embedded in an uploaded APK or bundle.
pub type VersionCode = i64;

/// Errors from type parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid release status '{0}', expected one of: draft, inProgress, halted, completed")]
    InvalidStatus(String),
}

/// Lifecycle state of a release on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseStatus {
    /// Not yet rolled out to anyone
    Draft,
    /// Staged rollout to a fraction of users
    InProgress,
    /// Staged rollout that has been stopped
    Halted,
    /// Available to all users of the track
    Completed,
    /// Status the API reports when none was set
    #[default]
    #[serde(rename = "statusUnspecified", other)]
    Unspecified,
}

impl ReleaseStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Draft => "draft",
            ReleaseStatus::InProgress => "inProgress",
            ReleaseStatus::Halted => "halted",
            ReleaseStatus::Completed => "completed",
            ReleaseStatus::Unspecified => "statusUnspecified",
        }
    }

    /// Whether a release in this status carries a user fraction.
    ///
    /// Only staged rollouts (in progress or halted) have one; the API
    /// rejects a fraction on draft and completed releases.
    pub fn is_staged(&self) -> bool {
        matches!(self, ReleaseStatus::InProgress | ReleaseStatus::Halted)
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(ReleaseStatus::Draft),
            "inProgress" => Ok(ReleaseStatus::InProgress),
            "halted" => Ok(ReleaseStatus::Halted),
            "completed" => Ok(ReleaseStatus::Completed),
            other => Err(TypeError::InvalidStatus(other.to_string())),
        }
    }
}

/// Release notes for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    /// BCP-47 language tag, e.g. `en-US`
    pub language: String,
    /// The notes themselves
    pub text: String,
}

/// A release on a track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version codes of the artifacts in this release
    #[serde(default, with = "version_codes")]
    pub version_codes: Vec<VersionCode>,
    /// Lifecycle status
    #[serde(default)]
    pub status: ReleaseStatus,
    /// Rollout fraction, only present for staged releases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_fraction: Option<f64>,
    /// Localized release notes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub release_notes: Vec<LocalizedText>,
    /// In-app update priority (0-5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app_update_priority: Option<u8>,
    /// Fields not modeled above, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Release {
    /// Create an empty release with the given status.
    pub fn with_status(status: ReleaseStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

/// A distribution channel (alpha, beta, production, internal or custom).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    /// Track identifier
    #[serde(rename = "track")]
    pub name: String,
    /// Releases on this track
    #[serde(default)]
    pub releases: Vec<Release>,
    /// Fields not modeled above, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Track {
    /// Create an empty track shell that exists only locally.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// All version codes across every release of the track.
    pub fn version_codes(&self) -> Vec<VersionCode> {
        self.releases
            .iter()
            .flat_map(|r| r.version_codes.iter().copied())
            .collect()
    }
}

/// Return the version codes that occur more than once, ascending.
///
/// Multi-APK uploads can legitimately produce repeated codes, so callers
/// report these rather than fail.
pub fn duplicate_version_codes(codes: &[VersionCode]) -> Vec<VersionCode> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for code in codes {
        if !seen.insert(*code) {
            duplicates.insert(*code);
        }
    }
    duplicates.into_iter().collect()
}

/// Serde adapter for int64 version codes encoded as JSON strings.
///
/// Numbers are accepted on input as well.
mod version_codes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::VersionCode;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireCode {
        Text(String),
        Number(VersionCode),
    }

    pub fn serialize<S: Serializer>(codes: &[VersionCode], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(codes.iter().map(|c| c.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<VersionCode>, D::Error> {
        Vec::<WireCode>::deserialize(d)?
            .into_iter()
            .map(|code| match code {
                WireCode::Number(n) => Ok(n),
                WireCode::Text(t) => t
                    .trim()
                    .parse()
                    .map_err(|_| D::Error::custom(format!("invalid version code '{}'", t))),
            })
            .collect()
    }
}
