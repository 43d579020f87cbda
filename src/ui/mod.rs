//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Progress lines, warnings and track formatting
//!
//! # Design
//!
//! All human-readable output goes through this module. Diagnostic detail
//! goes through `tracing` instead.

pub mod output;
