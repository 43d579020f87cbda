//! core
//!
//! Core domain types and pure logic for publishing releases.
//!
//! # Modules
//!
//! - [`types`] - Tracks, releases, statuses and version codes
//! - [`inputs`] - Resolution of path inputs into per-artifact records
//! - [`release_notes`] - Loading of `whatsnew-<locale>` files
//! - [`reconcile`] - Merging new version codes into a track
//! - [`config`] - Validated run configuration
//!
//! # Design Principles
//!
//! - Inputs are parsed once, at the boundary
//! - Nothing here talks to the network
//! - Reconciliation is deterministic

pub mod config;
pub mod inputs;
pub mod reconcile;
pub mod release_notes;
pub mod types;
