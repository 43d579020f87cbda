//! engine::run
//!
//! The deploy pipeline.
//!
//! # Example
//!
//! ```ignore
//! use play_deploy::engine::deploy;
//!
//! let report = deploy(&publisher, &config).await?;
//! println!("released {:?}", report.version_codes);
//! ```

use std::collections::BTreeMap;

use super::track::update_track;
use super::upload::upload_artifacts;
use super::DeployError;
use crate::core::config::Config;
use crate::core::release_notes::read_release_notes;
use crate::core::types::{Track, VersionCode};
use crate::publisher::Publisher;
use crate::ui::output;

/// How the edit was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Dry run: the edit was validated and left uncommitted
    Validated,
    /// The edit was committed
    Committed {
        /// Whether the changes were sent for review
        sent_for_review: bool,
    },
}

/// Summary of a successful deploy.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployReport {
    /// Id of the edit used
    pub edit_id: String,
    /// Version codes of the uploaded artifacts, in input order
    pub version_codes: Vec<VersionCode>,
    /// Target track as submitted
    pub track: Track,
    pub outcome: Outcome,
}

/// Run the whole deploy against `publisher`.
///
/// # Errors
///
/// Returns the first failure; nothing is retried here except the commit
/// recovery described in the [module docs](super).
pub async fn deploy(publisher: &dyn Publisher, config: &Config) -> Result<DeployReport, DeployError> {
    tracing::info!(
        publisher = publisher.name(),
        package = publisher.package_name(),
        track = %config.track,
        "starting deploy"
    );
    let notes = load_release_notes(config)?;

    output::section("Create new edit");
    let edit = publisher
        .insert_edit()
        .await
        .map_err(DeployError::publisher("create edit"))?;
    output::print(format!(" editID: {}", edit.id));

    output::section("List track infos");
    let tracks = publisher
        .list_tracks(&edit.id)
        .await
        .map_err(DeployError::publisher("list tracks"))?;
    for track in &tracks {
        output::print(output::format_track(track));
    }

    output::section("Upload apks or app bundles");
    let version_codes = upload_artifacts(publisher, &edit.id, config).await?;

    output::section("Update track");
    let plan = config.release_plan();
    let track = update_track(publisher, &edit.id, &plan, &version_codes, &notes).await?;
    output::success(format!("Track {} updated", track.name));

    let outcome = finish_edit(publisher, &edit.id, config).await?;

    Ok(DeployReport {
        edit_id: edit.id,
        version_codes,
        track,
        outcome,
    })
}

fn load_release_notes(config: &Config) -> Result<BTreeMap<String, String>, DeployError> {
    let Some(dir) = &config.whatsnews_dir else {
        return Ok(BTreeMap::new());
    };
    let notes = read_release_notes(dir)?;
    if notes.is_empty() {
        output::warn(format!("no whatsnew-<locale> files found in {}", dir.display()));
    } else {
        let locales: Vec<&str> = notes.keys().map(String::as_str).collect();
        tracing::info!(locales = ?locales, "loaded release notes");
    }
    Ok(notes)
}

/// Validate on a dry run, otherwise commit with the review recovery.
async fn finish_edit(
    publisher: &dyn Publisher,
    edit_id: &str,
    config: &Config,
) -> Result<Outcome, DeployError> {
    if config.dry_run {
        output::section("Validating edit");
        return match publisher.validate_edit(edit_id).await {
            Ok(_) => {
                output::success("Edit is valid");
                Ok(Outcome::Validated)
            }
            Err(err) if err.is_review_refusal() && config.retry_without_sending_to_review => {
                commit_without_review(publisher, edit_id).await
            }
            Err(err) => Err(DeployError::publisher("validate edit")(err)),
        };
    }

    output::section("Committing edit");
    match publisher.commit_edit(edit_id, false).await {
        Ok(_) => {
            output::success("Edit committed");
            Ok(Outcome::Committed {
                sent_for_review: true,
            })
        }
        Err(err) if err.is_review_refusal() && config.retry_without_sending_to_review => {
            commit_without_review(publisher, edit_id).await
        }
        Err(err) => Err(DeployError::publisher("commit edit")(err)),
    }
}

/// Commit with `changesNotSentForReview` after the service refused review.
async fn commit_without_review(
    publisher: &dyn Publisher,
    edit_id: &str,
) -> Result<Outcome, DeployError> {
    output::warn("Changes cannot be sent for review automatically, committing without sending them for review");
    publisher
        .commit_edit(edit_id, true)
        .await
        .map_err(DeployError::publisher("commit edit"))?;
    output::success("Edit committed, changes not sent for review");
    Ok(Outcome::Committed {
        sent_for_review: false,
    })
}
