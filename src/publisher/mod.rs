//! publisher
//!
//! Abstraction for the app publishing service.
//!
//! # Architecture
//!
//! The `Publisher` trait defines the interface the deploy engine drives.
//! The engine never imports a concrete implementation; the CLI builds the
//! Google Play client and tests use the mock.
//!
//! # Modules
//!
//! - `traits`: Core `Publisher` trait, error and response types
//! - [`google`]: Google Play implementation over the Android Publisher REST API
//! - [`mock`]: Mock implementation for deterministic testing

pub mod google;
pub mod mock;
mod traits;

pub use traits::*;
