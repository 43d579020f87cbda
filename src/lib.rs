//! play-deploy - Publish Android apps to Google Play from CI
//!
//! play-deploy uploads APKs or App Bundles to the Google Play Developer
//! Publishing API, places their version codes on a release track, and
//! commits the change in a single edit.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses inputs, delegates to engine)
//! - [`core`] - Input resolution, release notes, configuration and track reconciliation
//! - [`engine`] - The deploy pipeline: edit, upload, update track, commit
//! - [`publisher`] - Abstraction over the publishing API (Google Play, mock)
//! - [`auth`] - Service account keys and OAuth access tokens
//! - [`ui`] - User-facing output
//!
//! # Guarantees
//!
//! 1. Configuration is validated before any network call
//! 2. Every change of a run goes through one edit
//! 3. The edit is committed only after every upload and the track update succeeded

pub mod auth;
pub mod cli;
pub mod core;
pub mod engine;
pub mod publisher;
pub mod ui;
