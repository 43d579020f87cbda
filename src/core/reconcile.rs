//! core::reconcile
//!
//! Merges newly uploaded version codes into a track's existing releases.
//!
//! # Algorithm
//!
//! 1. Pick the target track out of the listed tracks, or start an empty one.
//! 2. Decide the release status: an explicit status wins, otherwise a
//!    non-zero user fraction means `inProgress` and zero means `completed`.
//! 3. Find the first release with that status, or append a new empty one.
//!    Reusing by status keeps the track free of duplicate releases the API
//!    would reject (two `completed` releases, for instance).
//! 4. Merge the version codes into that release:
//!    - plain mode appends the new codes;
//!    - blocking-version mode replaces the codes outright when the counts
//!      differ, and otherwise sorts both lists and keeps, per position, the
//!      current code unless it is strictly lower than the new one.
//! 5. Set the user fraction on staged releases only and clear it elsewhere.
//! 6. Attach name, update priority and release notes.
//!
//! Everything here is pure; the engine fetches and submits the track.
//!
//! # Tie-breaking
//!
//! A position only switches to the new code when `current < new`. On equal
//! codes the current one is kept, which yields the same number either way.
//!
//! # Example
//!
//! ```
//! use play_deploy::core::reconcile::remove_blocking_versions;
//!
//! let merged = remove_blocking_versions(&[5, 6, 7, 8], &[4, 6, 8, 10]);
//! assert_eq!(merged.codes, vec![5, 6, 8, 10]);
//! ```

use std::collections::BTreeMap;

use super::release_notes::to_localized_texts;
use super::types::{Release, ReleaseStatus, Track, VersionCode};

/// How a release should look after the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePlan {
    /// Target track name
    pub track: String,
    /// Status of the release receiving the new codes
    pub status: ReleaseStatus,
    /// Rollout fraction; `0.0` means a full rollout
    pub user_fraction: f64,
    /// Release name to set, if any
    pub name: Option<String>,
    /// In-app update priority to set, if any
    pub update_priority: Option<u8>,
    /// Whether blocking versions are reconciled instead of appended to
    pub untrack_blocking_versions: bool,
}

/// Per-position decision of the blocking-version comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeDecision {
    /// The current code was lower and is replaced by the new one
    TookNew { current: VersionCode, new: VersionCode },
    /// The current code was not lower and stays
    KeptCurrent { current: VersionCode, new: VersionCode },
}

/// How version codes ended up in the release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeKind {
    /// New codes were appended to the existing ones
    Appended,
    /// Counts differed; the existing codes were dropped
    Replaced { removed: Vec<VersionCode> },
    /// Counts matched; codes were compared position by position
    Compared { decisions: Vec<CodeDecision> },
}

/// Result of merging version codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    /// Resulting version codes of the release
    pub codes: Vec<VersionCode>,
    /// What happened
    pub kind: MergeKind,
}

/// Summary of a reconciled track, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Index of the release that received the codes
    pub release_index: usize,
    /// Whether that release was created by this run
    pub created_release: bool,
    /// How the codes were merged
    pub merge: Merge,
}

/// Infer the release status from configuration.
///
/// An explicit status always wins. Otherwise a non-zero fraction is a
/// staged rollout and zero is a completed release.
pub fn infer_status(explicit: Option<ReleaseStatus>, user_fraction: f64) -> ReleaseStatus {
    match explicit {
        Some(status) => status,
        None if user_fraction != 0.0 => ReleaseStatus::InProgress,
        None => ReleaseStatus::Completed,
    }
}

/// Take the track named `name` out of `tracks`, or synthesize an empty one.
pub fn select_track(tracks: Vec<Track>, name: &str) -> Track {
    tracks
        .into_iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| Track::empty(name))
}

/// Return the index of the first release with `status`, appending an empty
/// release with that status if there is none.
///
/// The boolean is `true` when a release was created.
pub fn locate_or_create_release(releases: &mut Vec<Release>, status: ReleaseStatus) -> (usize, bool) {
    if let Some(index) = releases.iter().position(|r| r.status == status) {
        return (index, false);
    }
    releases.push(Release::with_status(status));
    (releases.len() - 1, true)
}

/// Merge new version codes into the current ones.
pub fn merge_version_codes(
    current: &[VersionCode],
    new: &[VersionCode],
    untrack_blocking_versions: bool,
) -> Merge {
    if untrack_blocking_versions {
        return remove_blocking_versions(current, new);
    }
    let mut codes = current.to_vec();
    codes.extend_from_slice(new);
    Merge {
        codes,
        kind: MergeKind::Appended,
    }
}

/// Reconcile current codes against new ones so that no previously released
/// higher code shadows a new one.
///
/// With differing counts the new codes replace the current ones. With equal
/// counts both lists are sorted ascending and each position keeps the
/// higher code, the current one winning ties.
pub fn remove_blocking_versions(current: &[VersionCode], new: &[VersionCode]) -> Merge {
    if current.len() != new.len() {
        return Merge {
            codes: new.to_vec(),
            kind: MergeKind::Replaced {
                removed: current.to_vec(),
            },
        };
    }

    let mut current = current.to_vec();
    let mut new = new.to_vec();
    current.sort_unstable();
    new.sort_unstable();

    let decisions: Vec<CodeDecision> = current
        .iter()
        .zip(&new)
        .map(|(&current, &new)| {
            if current < new {
                CodeDecision::TookNew { current, new }
            } else {
                CodeDecision::KeptCurrent { current, new }
            }
        })
        .collect();

    let codes = decisions
        .iter()
        .map(|d| match *d {
            CodeDecision::TookNew { new, .. } => new,
            CodeDecision::KeptCurrent { current, .. } => current,
        })
        .collect();

    Merge {
        codes,
        kind: MergeKind::Compared { decisions },
    }
}

/// Apply the plan to a track in place.
///
/// `notes` replaces the release notes when present and non-empty.
pub fn apply_release_plan(
    track: &mut Track,
    plan: &ReleasePlan,
    new_codes: &[VersionCode],
    notes: Option<&BTreeMap<String, String>>,
) -> ReconcileReport {
    let (release_index, created_release) =
        locate_or_create_release(&mut track.releases, plan.status);
    let release = &mut track.releases[release_index];

    let merge = merge_version_codes(
        &release.version_codes,
        new_codes,
        plan.untrack_blocking_versions,
    );
    release.version_codes = merge.codes.clone();

    release.user_fraction = if release.status.is_staged() {
        Some(plan.user_fraction).filter(|f| *f > 0.0)
    } else {
        None
    };

    if let Some(name) = &plan.name {
        release.name = Some(name.clone());
    }
    if let Some(priority) = plan.update_priority {
        release.in_app_update_priority = Some(priority);
    }
    if let Some(notes) = notes.filter(|n| !n.is_empty()) {
        release.release_notes = to_localized_texts(notes);
    }

    ReconcileReport {
        release_index,
        created_release,
        merge,
    }
}
