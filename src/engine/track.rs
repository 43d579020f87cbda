//! engine::track
//!
//! Remote half of track reconciliation: fetch the tracks of the edit,
//! apply the release plan locally, and submit the target track.

use std::collections::BTreeMap;

use super::DeployError;
use crate::core::reconcile::{
    apply_release_plan, select_track, CodeDecision, MergeKind, ReconcileReport, ReleasePlan,
};
use crate::core::types::{Track, VersionCode};
use crate::publisher::Publisher;
use crate::ui::output;

/// Merge `version_codes` into the planned track and submit it.
///
/// Returns the track as accepted by the service.
pub async fn update_track(
    publisher: &dyn Publisher,
    edit_id: &str,
    plan: &ReleasePlan,
    version_codes: &[VersionCode],
    notes: &BTreeMap<String, String>,
) -> Result<Track, DeployError> {
    let tracks = publisher
        .list_tracks(edit_id)
        .await
        .map_err(DeployError::publisher("list tracks"))?;
    let mut track = select_track(tracks, &plan.track);
    if track.releases.is_empty() {
        tracing::debug!(track = %plan.track, "track has no releases yet");
    }

    let report = apply_release_plan(&mut track, plan, version_codes, Some(notes));
    report_merge(&track, &report);

    let release = &track.releases[report.release_index];
    if release.status.is_staged() {
        if let Some(fraction) = release.user_fraction {
            output::print(format!(
                "Release is a staged rollout, {} of users will receive it.",
                fraction
            ));
        }
    }

    publisher
        .update_track(edit_id, &track)
        .await
        .map_err(DeployError::publisher("update track"))
}

fn report_merge(track: &Track, report: &ReconcileReport) {
    let release = &track.releases[report.release_index];
    if report.created_release {
        tracing::debug!(status = %release.status, "created new release");
    }

    match &report.merge.kind {
        MergeKind::Appended => {}
        MergeKind::Replaced { removed } => {
            output::warn(format!(
                "mismatching version code count, removing ({:?}) versions from track: {}",
                removed, track.name
            ));
        }
        MergeKind::Compared { decisions } => {
            for decision in decisions {
                match decision {
                    CodeDecision::TookNew { current, new } => output::print(format!(
                        "Shadowing version found, removing current ({}) version, adding new ({})",
                        current, new
                    )),
                    CodeDecision::KeptCurrent { current, new } => output::print(format!(
                        "Currently released version ({}) is not lower than new ({}), new version code ignored",
                        current, new
                    )),
                }
            }
        }
    }
    output::print(format!(
        "Release version codes are: {:?}",
        report.merge.codes
    ));
}
