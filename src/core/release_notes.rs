//! core::release_notes
//!
//! Loads localized "what's new" texts from a directory.
//!
//! Files are named `whatsnew-<locale>`, where the locale is a BCP-47 style
//! tag made of alphanumeric subtags separated by `-` (`en-US`, `ca`,
//! `es-419`, `sr-Latn-RS`). Each file's UTF-8 content becomes the release
//! notes for that language.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::types::LocalizedText;

/// File name prefix of release-note files.
pub const WHATSNEW_PREFIX: &str = "whatsnew-";

/// Errors from loading release notes.
#[derive(Debug, Error)]
pub enum ReleaseNotesError {
    #[error("invalid release notes pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("failed to read release notes '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn locale_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^whatsnew-(?P<locale>[0-9A-Za-z]+(?:-[0-9A-Za-z]+)*)$")
            .expect("locale pattern is a valid regex")
    })
}

/// Extract the locale from a release-notes file name.
///
/// Returns `None` for names that do not follow `whatsnew-<locale>`.
pub fn locale_from_file_name(file_name: &str) -> Option<&str> {
    locale_regex()
        .captures(file_name)
        .and_then(|c| c.name("locale"))
        .map(|m| m.as_str())
}

/// Read every `whatsnew-<locale>` file in `dir` into a locale → text map.
///
/// A missing directory yields an empty map. Files whose names do not carry
/// a valid locale are skipped.
///
/// # Errors
///
/// Returns an error if a matching file cannot be read as UTF-8.
pub fn read_release_notes(dir: &Path) -> Result<BTreeMap<String, String>, ReleaseNotesError> {
    let mut notes = BTreeMap::new();
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "release notes directory not found");
        return Ok(notes);
    }

    let pattern = format!(
        "{}/{}*",
        glob::Pattern::escape(&dir.to_string_lossy()),
        WHATSNEW_PREFIX
    );
    let entries = glob::glob(&pattern).map_err(|e| ReleaseNotesError::Pattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    for path in entries.flatten() {
        if !path.is_file() {
            continue;
        }
        let Some(locale) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(locale_from_file_name)
        else {
            tracing::debug!(path = %path.display(), "skipping file without a locale");
            continue;
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ReleaseNotesError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(locale, "found release notes");
        notes.insert(locale.to_string(), text);
    }

    if notes.is_empty() {
        tracing::debug!("no release notes found");
    }
    Ok(notes)
}

/// Convert a locale → text map into the API's localized text list.
pub fn to_localized_texts(notes: &BTreeMap<String, String>) -> Vec<LocalizedText> {
    notes
        .iter()
        .map(|(language, text)| LocalizedText {
            language: language.clone(),
            text: text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn single_language() {
        let dir = dir_with(&[("whatsnew-en-US", "English")]);
        let notes = read_release_notes(dir.path()).unwrap();
        assert_eq!(notes, map(&[("en-US", "English")]));
    }

    #[test]
    fn two_languages() {
        let dir = dir_with(&[("whatsnew-en-US", "English"), ("whatsnew-de-DE", "German")]);
        let notes = read_release_notes(dir.path()).unwrap();
        assert_eq!(notes, map(&[("en-US", "English"), ("de-DE", "German")]));
    }

    #[test]
    fn tag_variants() {
        let dir = dir_with(&[
            ("whatsnew-ca", "Catalan"),
            ("whatsnew-es-419", "Latin American Spanish"),
            ("whatsnew-sr-Latn-RS", "Serbian"),
        ]);
        let notes = read_release_notes(dir.path()).unwrap();
        assert_eq!(
            notes,
            map(&[
                ("ca", "Catalan"),
                ("es-419", "Latin American Spanish"),
                ("sr-Latn-RS", "Serbian"),
            ])
        );
    }

    #[test]
    fn ignores_other_files() {
        let dir = dir_with(&[
            ("whatsnew-en-US", "English"),
            ("README.md", "docs"),
            ("whatsnew-", "no locale"),
            ("whatsnew-en-US.txt", "extension"),
        ]);
        std::fs::create_dir(dir.path().join("whatsnew-fr-FR")).unwrap();

        let notes = read_release_notes(dir.path()).unwrap();
        assert_eq!(notes, map(&[("en-US", "English")]));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let notes = read_release_notes(&dir.path().join("nope")).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn directory_name_with_glob_characters() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("notes[1]");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("whatsnew-en-GB"), "British").unwrap();

        let notes = read_release_notes(&dir).unwrap();
        assert_eq!(notes, map(&[("en-GB", "British")]));
    }

    #[test]
    fn locale_extraction() {
        assert_eq!(locale_from_file_name("whatsnew-en-US"), Some("en-US"));
        assert_eq!(locale_from_file_name("whatsnew-ca"), Some("ca"));
        assert_eq!(locale_from_file_name("whatsnew--US"), None);
        assert_eq!(locale_from_file_name("whatsnew-en-"), None);
        assert_eq!(locale_from_file_name("notes-en-US"), None);
    }

    #[test]
    fn localized_texts_follow_map_order() {
        let texts = to_localized_texts(&map(&[("en-US", "English"), ("de-DE", "German")]));
        assert_eq!(texts[0].language, "de-DE");
        assert_eq!(texts[1].text, "English");
    }
}
