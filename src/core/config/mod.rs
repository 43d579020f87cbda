//! core::config
//!
//! Validated, immutable run configuration.
//!
//! # Overview
//!
//! All inputs are checked here, before any remote call:
//! - the key location parses and a local key exists
//! - package name and track are non-empty
//! - apps resolve, and every app, expansion, mapping and symbol file exists
//! - the user fraction is `0` (full rollout) or strictly between 0 and 1
//! - the status is valid and staged statuses have a fraction
//! - the update priority is within 0..=5
//! - the release-notes directory, when given, is a directory
//!
//! Findings that do not stop the run come back as warnings in
//! [`ConfigLoadResult`].
//!
//! # Example
//!
//! ```no_run
//! use play_deploy::core::config::{Config, RawInputs};
//!
//! let raw = RawInputs {
//!     service_account_json_key_path: "/keys/sa.json".into(),
//!     package_name: "com.example.app".into(),
//!     app_path: "app-release.aab".into(),
//!     track: "internal".into(),
//!     ..RawInputs::default()
//! };
//! let result = Config::from_inputs(raw).unwrap();
//! for warning in &result.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! println!("deploying to {}", result.config.track);
//! ```

pub mod schema;

pub use schema::{KeySource, RawInputs};

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::inputs::{self, ArtifactRecord, InputError};
use super::reconcile::{infer_status, ReleasePlan};
use super::types::{ReleaseStatus, TypeError};

/// Highest accepted in-app update priority.
pub const MAX_UPDATE_PRIORITY: u8 = 5;

/// Errors from configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingValue(&'static str),

    #[error("unsupported service account key scheme '{0}', use a local path, file://, http:// or https://")]
    UnsupportedKeyScheme(String),

    #[error("{what} not found at '{path}'")]
    FileNotFound { what: &'static str, path: PathBuf },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("invalid user fraction '{0}', expected a number greater than 0 and less than 1, or 0 for a full rollout")]
    InvalidUserFraction(String),

    #[error(transparent)]
    Status(#[from] TypeError),

    #[error("status '{0}' requires a user fraction greater than 0")]
    FractionRequired(ReleaseStatus),

    #[error("invalid update priority '{0}', expected an integer from 0 to 5")]
    InvalidUpdatePriority(String),

    #[error("release notes directory '{0}' is not a directory")]
    NotADirectory(PathBuf),
}

/// Result of validating configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The validated configuration.
    pub config: Config,
    /// Non-fatal findings to show the user.
    pub warnings: Vec<String>,
}

/// Validated configuration for one deploy run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Service-account key location
    pub key: KeySource,
    /// Application id
    pub package_name: String,
    /// Artifacts to upload, in input order
    pub artifacts: Vec<ArtifactRecord>,
    /// Target track
    pub track: String,
    /// Rollout fraction; `0.0` means a full rollout
    pub user_fraction: f64,
    /// Effective release status
    pub status: ReleaseStatus,
    pub release_name: Option<String>,
    pub update_priority: Option<u8>,
    /// Directory holding `whatsnew-<locale>` files
    pub whatsnews_dir: Option<PathBuf>,
    pub untrack_blocking_versions: bool,
    pub retry_without_sending_to_review: bool,
    pub ack_bundle_installation_warning: bool,
    /// Validate the edit instead of committing it
    pub dry_run: bool,
    pub verbose_log: bool,
}

impl Config {
    /// Validate raw inputs into a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn from_inputs(raw: RawInputs) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let key = KeySource::parse(&raw.service_account_json_key_path)?;
        if let KeySource::Local(path) = &key {
            require_file("service account key", path)?;
        }

        let package_name = required("package_name", &raw.package_name)?;
        let track = required("track", &raw.track)?;

        let resolved = inputs::resolve_apps(&raw.app_path, raw.apk_path.as_deref())?;
        warnings.extend(resolved.warnings);
        let apps = resolved.apps;

        let expansions = inputs::expansion_files(&apps, &raw.expansionfile_path)?;
        let mappings = inputs::paired_files("mapping", &apps, &raw.mapping_file)?;
        let symbols = inputs::paired_files("native symbols", &apps, &raw.native_symbols_file)?;
        let artifacts = inputs::build_records(apps, expansions, mappings, symbols, &mut warnings);

        for record in &artifacts {
            require_file("app", &record.app.path)?;
            if let Some(expansion) = &record.expansion {
                require_file("expansion file", &expansion.path)?;
            }
            if let Some(mapping) = &record.mapping {
                require_file("mapping file", mapping)?;
            }
            if let Some(symbols) = &record.native_symbols {
                require_file("native symbols file", symbols)?;
            }
        }

        let mut user_fraction = parse_user_fraction(raw.user_fraction.as_deref())?;
        let explicit = non_empty(raw.status.as_deref())
            .map(str::parse::<ReleaseStatus>)
            .transpose()?;
        let status = infer_status(explicit, user_fraction);
        if status.is_staged() && user_fraction == 0.0 {
            return Err(ConfigError::FractionRequired(status));
        }
        if !status.is_staged() && user_fraction != 0.0 {
            warnings.push(format!(
                "user fraction {} is ignored for a '{}' release",
                user_fraction, status
            ));
            user_fraction = 0.0;
        }

        let update_priority = non_empty(raw.update_priority.as_deref())
            .map(parse_update_priority)
            .transpose()?;

        let whatsnews_dir = non_empty(raw.whatsnews_dir.as_deref()).map(PathBuf::from);
        if let Some(dir) = &whatsnews_dir {
            if !dir.is_dir() {
                return Err(ConfigError::NotADirectory(dir.clone()));
            }
        }

        Ok(ConfigLoadResult {
            config: Config {
                key,
                package_name,
                artifacts,
                track,
                user_fraction,
                status,
                release_name: non_empty(raw.release_name.as_deref()).map(str::to_string),
                update_priority,
                whatsnews_dir,
                untrack_blocking_versions: raw.untrack_blocking_versions,
                retry_without_sending_to_review: raw.retry_without_sending_to_review,
                ack_bundle_installation_warning: raw.ack_bundle_installation_warning,
                dry_run: raw.dry_run,
                verbose_log: raw.verbose_log,
            },
            warnings,
        })
    }

    /// How the target release should look after the upload.
    pub fn release_plan(&self) -> ReleasePlan {
        ReleasePlan {
            track: self.track.clone(),
            status: self.status,
            user_fraction: self.user_fraction,
            name: self.release_name.clone(),
            update_priority: self.update_priority,
            untrack_blocking_versions: self.untrack_blocking_versions,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(name: &'static str, value: &str) -> Result<String, ConfigError> {
    non_empty(Some(value))
        .map(str::to_string)
        .ok_or(ConfigError::MissingValue(name))
}

fn require_file(what: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::FileNotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn parse_user_fraction(raw: Option<&str>) -> Result<f64, ConfigError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(0.0);
    };
    let fraction: f64 = raw
        .parse()
        .map_err(|_| ConfigError::InvalidUserFraction(raw.to_string()))?;
    if fraction == 0.0 || (fraction > 0.0 && fraction < 1.0) {
        Ok(fraction)
    } else {
        Err(ConfigError::InvalidUserFraction(raw.to_string()))
    }
}

fn parse_update_priority(raw: &str) -> Result<u8, ConfigError> {
    raw.parse::<u8>()
        .ok()
        .filter(|p| *p <= MAX_UPDATE_PRIORITY)
        .ok_or_else(|| ConfigError::InvalidUpdatePriority(raw.to_string()))
}
