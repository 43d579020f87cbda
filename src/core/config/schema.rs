//! core::config::schema
//!
//! Raw input shape and key-source parsing.
//!
//! # Raw inputs
//!
//! [`RawInputs`] mirrors the step inputs exactly as they arrive from flags
//! or the environment: untyped strings and booleans. Nothing here is
//! validated; [`super::Config::from_inputs`] does that.
//!
//! # Key sources
//!
//! The service-account key path is one of:
//! - a local path, optionally prefixed with `file://`
//! - an `http://` or `https://` URL, downloaded at run time

use std::fmt;
use std::path::PathBuf;

use super::ConfigError;

/// Step inputs before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInputs {
    /// Service-account key location
    pub service_account_json_key_path: String,
    /// Application id
    pub package_name: String,
    /// App list (`|` or newline separated)
    pub app_path: String,
    /// Deprecated APK list
    pub apk_path: Option<String>,
    /// Expansion files (`main:<path>|patch:<path>|...`)
    pub expansionfile_path: String,
    /// Deobfuscation mapping files
    pub mapping_file: String,
    /// Native debug symbol archives
    pub native_symbols_file: String,
    /// Target track
    pub track: String,
    /// Rollout fraction
    pub user_fraction: Option<String>,
    /// Release status
    pub status: Option<String>,
    /// Release name
    pub release_name: Option<String>,
    /// In-app update priority
    pub update_priority: Option<String>,
    /// Directory holding `whatsnew-<locale>` files
    pub whatsnews_dir: Option<String>,
    pub untrack_blocking_versions: bool,
    pub retry_without_sending_to_review: bool,
    pub ack_bundle_installation_warning: bool,
    pub dry_run: bool,
    pub verbose_log: bool,
}

/// Where the service-account key is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// A file on disk
    Local(PathBuf),
    /// A URL fetched over HTTP(S)
    Remote(String),
}

impl KeySource {
    /// Parse a key location.
    ///
    /// Only syntax is checked here; local existence is checked by the
    /// config loader.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingValue("service_account_json_key_path"));
        }

        if let Some(path) = raw.strip_prefix("file://") {
            return Ok(KeySource::Local(PathBuf::from(path)));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(KeySource::Remote(raw.to_string()));
        }
        if let Some((scheme, _)) = raw.split_once("://") {
            return Err(ConfigError::UnsupportedKeyScheme(scheme.to_string()));
        }
        Ok(KeySource::Local(PathBuf::from(raw)))
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Local(path) => write!(f, "{}", path.display()),
            KeySource::Remote(url) => f.write_str(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_is_local() {
        assert_eq!(
            KeySource::parse("/keys/sa.json").unwrap(),
            KeySource::Local(PathBuf::from("/keys/sa.json"))
        );
    }

    #[test]
    fn file_scheme_is_stripped() {
        assert_eq!(
            KeySource::parse("file:///keys/sa.json").unwrap(),
            KeySource::Local(PathBuf::from("/keys/sa.json"))
        );
    }

    #[test]
    fn http_urls_are_remote() {
        assert_eq!(
            KeySource::parse("https://example.com/sa.json").unwrap(),
            KeySource::Remote("https://example.com/sa.json".into())
        );
        assert!(matches!(
            KeySource::parse("http://example.com/sa.json").unwrap(),
            KeySource::Remote(_)
        ));
    }

    #[test]
    fn other_schemes_are_rejected() {
        let err = KeySource::parse("ftp://example.com/sa.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedKeyScheme(s) if s == "ftp"));
    }

    #[test]
    fn empty_is_missing() {
        assert!(matches!(
            KeySource::parse("  "),
            Err(ConfigError::MissingValue(_))
        ));
    }
}
