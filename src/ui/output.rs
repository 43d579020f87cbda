//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Progress goes to stdout, warnings and errors to stderr. Debug lines only
//! appear with verbose logging enabled.

use std::fmt::Display;

use crate::core::types::{Release, Track};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Normal mode - standard output
    #[default]
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from the verbose flag.
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a step header.
pub fn section(title: impl Display) {
    println!();
    println!("{}", title);
}

/// Print a message.
pub fn print(message: impl Display) {
    println!("{}", message);
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message.
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message.
pub fn warn(message: impl Display) {
    eprintln!("warning: {}", message);
}

/// Print a success message.
pub fn success(message: impl Display) {
    println!("done: {}", message);
}

/// Format a release as a single line.
pub fn format_release(release: &Release) -> String {
    format!(
        "'{}' release versionCodes: {:?}, status: '{}'",
        release.name.as_deref().unwrap_or_default(),
        release.version_codes,
        release.status
    )
}

/// Format a track with one line per release.
pub fn format_track(track: &Track) -> String {
    let releases: Vec<String> = track.releases.iter().map(format_release).collect();
    if releases.is_empty() {
        format!("{} track:", track.name)
    } else {
        format!("{} track:\n{}", track.name, format_list(&releases, "- "))
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ReleaseStatus;

    #[test]
    fn verbosity_from_flag() {
        assert_eq!(Verbosity::from_flag(true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flag(false), Verbosity::Normal);
    }

    #[test]
    fn formats_track_with_releases() {
        let track = Track {
            releases: vec![
                Release {
                    name: Some("1.0".into()),
                    version_codes: vec![1, 2],
                    ..Release::with_status(ReleaseStatus::Completed)
                },
                Release {
                    version_codes: vec![3],
                    user_fraction: Some(0.1),
                    ..Release::with_status(ReleaseStatus::InProgress)
                },
            ],
            ..Track::empty("production")
        };

        assert_eq!(
            format_track(&track),
            "production track:\n\
             - '1.0' release versionCodes: [1, 2], status: 'completed'\n\
             - '' release versionCodes: [3], status: 'inProgress'"
        );
    }

    #[test]
    fn formats_empty_track() {
        assert_eq!(format_track(&Track::empty("internal")), "internal track:");
    }

    #[test]
    fn format_list_prefixes_lines() {
        assert_eq!(format_list(&["a", "b"], "* "), "* a\n* b");
    }
}
