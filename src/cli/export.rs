//! cli::export
//!
//! Export of step outputs to the CI environment through `envman`.
//!
//! `envman` is the CI platform's helper for passing values between steps.
//! Outside that platform it is missing, which is not an error.

use std::io;
use std::process::Command;

/// Environment helper binary.
pub const ENVMAN: &str = "envman";

/// Key under which the failure message is exported.
pub const FAILURE_REASON_KEY: &str = "FAILURE_REASON";

/// Outcome of an export attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Export {
    /// The value was stored
    Stored,
    /// The helper is not installed
    Unavailable,
}

/// Store `key=value` with the helper `tool`.
///
/// # Errors
///
/// Returns an error if the helper exists but cannot run or exits non-zero.
pub fn export_env(tool: &str, key: &str, value: &str) -> io::Result<Export> {
    let output = match Command::new(tool)
        .args(["add", "--key", key, "--value", value])
        .output()
    {
        Ok(output) => output,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Export::Unavailable),
        Err(err) => return Err(err),
    };

    if output.status.success() {
        Ok(Export::Stored)
    } else {
        Err(io::Error::other(format!(
            "{} exited with {}: {}",
            tool,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// Export the failure message as `FAILURE_REASON`, logging the outcome.
pub fn export_failure_reason(message: &str) {
    match export_env(ENVMAN, FAILURE_REASON_KEY, message) {
        Ok(Export::Stored) => tracing::debug!("exported {}", FAILURE_REASON_KEY),
        Ok(Export::Unavailable) => {
            tracing::debug!("{} not found, {} not exported", ENVMAN, FAILURE_REASON_KEY)
        }
        Err(err) => tracing::warn!(error = %err, "failed to export {}", FAILURE_REASON_KEY),
    }
}
