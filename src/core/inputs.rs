//! core::inputs
//!
//! Resolution of the delimited path inputs into per-artifact records.
//!
//! # Overview
//!
//! CI inputs arrive as flat strings: a list of app paths, an optional list of
//! expansion files (`main:<path>` / `patch:<path>`), optional mapping files
//! and native symbol files. This module parses them once, at the boundary,
//! into an ordered list of [`ArtifactRecord`]s. Downstream code never
//! re-zips parallel lists by index.
//!
//! # Rules
//!
//! - App lists are split on `|`, newlines and the literal two-character
//!   sequence `\n`; entries are trimmed and empty entries dropped.
//! - Extensions are matched case-insensitively. Unknown extensions produce a
//!   warning and are dropped.
//! - When both `.aab` and `.apk` files are given, all bundles are kept and
//!   the APKs are discarded with a single warning.
//! - Expansion entries are split on `|` only and keep empty entries, which
//!   mean "no expansion file for this artifact". When any are given, their
//!   count must equal the number of apps.
//!
//! # Example
//!
//! ```
//! use play_deploy::core::inputs::{resolve_apps, AppKind};
//!
//! let resolved = resolve_apps("app.apk|app.aab", None).unwrap();
//! assert_eq!(resolved.apps.len(), 1);
//! assert_eq!(resolved.apps[0].kind, AppKind::Bundle);
//! assert_eq!(resolved.warnings.len(), 1);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Separators accepted between entries of an app list, applied in order.
const LIST_SEPARATORS: [&str; 3] = ["\n", "\\n", "|"];

/// Separator between expansion-file and paired-file entries.
const ENTRY_SEPARATOR: char = '|';

/// Errors from input resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("no app provided, use app_path to specify .apk or .aab file(s)")]
    NoApp,

    #[error("mismatching number of APKs({apps}) and Expansionfiles({entries})")]
    ExpansionCountMismatch { apps: usize, entries: usize },

    #[error("invalid expansion file config: {0}, expected main:<path> or patch:<path>")]
    InvalidExpansionEntry(String),

    #[error("mismatching number of apps({apps}) and {what} files({entries})")]
    PairedCountMismatch {
        what: &'static str,
        apps: usize,
        entries: usize,
    },
}

/// Kind of an uploadable app artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppKind {
    /// Android package (`.apk`)
    Apk,
    /// Android App Bundle (`.aab`)
    Bundle,
}

impl AppKind {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "apk" => Some(AppKind::Apk),
            "aab" => Some(AppKind::Bundle),
            _ => None,
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppKind::Apk => write!(f, "apk"),
            AppKind::Bundle => write!(f, "app bundle"),
        }
    }
}

/// An app file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppArtifact {
    /// Path to the file
    pub path: PathBuf,
    /// APK or bundle
    pub kind: AppKind,
}

/// Expansion file slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpansionSlot {
    /// Main expansion file
    Main,
    /// Patch expansion file
    Patch,
}

impl ExpansionSlot {
    /// Wire name of the slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionSlot::Main => "main",
            ExpansionSlot::Patch => "patch",
        }
    }
}

impl fmt::Display for ExpansionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expansion (`.obb`) file bound to one APK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionFile {
    /// Main or patch
    pub slot: ExpansionSlot,
    /// Path to the file
    pub path: PathBuf,
}

impl FromStr for ExpansionFile {
    type Err = InputError;

    /// Parse a `main:<path>` or `patch:<path>` entry.
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let clean = entry.trim();
        let (slot, rest) = if let Some(rest) = clean.strip_prefix("main:") {
            (ExpansionSlot::Main, rest)
        } else if let Some(rest) = clean.strip_prefix("patch:") {
            (ExpansionSlot::Patch, rest)
        } else {
            return Err(InputError::InvalidExpansionEntry(entry.to_string()));
        };

        let path = rest.trim();
        if path.is_empty() {
            return Err(InputError::InvalidExpansionEntry(entry.to_string()));
        }

        Ok(Self {
            slot,
            path: PathBuf::from(path),
        })
    }
}

impl fmt::Display for ExpansionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.path.display())
    }
}

/// Everything uploaded for one app artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// The app file
    pub app: AppArtifact,
    /// Expansion file (APKs only)
    pub expansion: Option<ExpansionFile>,
    /// Deobfuscation mapping file
    pub mapping: Option<PathBuf>,
    /// Native debug symbols archive
    pub native_symbols: Option<PathBuf>,
}

/// Apps resolved from the raw inputs, with warnings to show the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedApps {
    /// Apps to upload, in input order
    pub apps: Vec<AppArtifact>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

/// Split a delimited path list into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut parts = vec![raw.to_string()];
    for sep in LIST_SEPARATORS {
        parts = parts
            .iter()
            .flat_map(|p| p.split(sep).map(str::to_string))
            .collect();
    }
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Classify paths into apps, preferring bundles over APKs.
///
/// Never fails; unknown extensions and the APK/AAB conflict are reported
/// as warnings.
pub fn classify(paths: &[String]) -> ResolvedApps {
    let mut apks = Vec::new();
    let mut bundles = Vec::new();
    let mut warnings = Vec::new();

    for pth in paths {
        let path = PathBuf::from(pth);
        match AppKind::from_path(&path) {
            Some(AppKind::Apk) => apks.push(AppArtifact {
                path,
                kind: AppKind::Apk,
            }),
            Some(AppKind::Bundle) => bundles.push(AppArtifact {
                path,
                kind: AppKind::Bundle,
            }),
            None => warnings.push(format!(
                "unknown app path extension in path: {}, supported extensions: .apk, .aab",
                pth
            )),
        }
    }

    if bundles.is_empty() {
        return ResolvedApps {
            apps: apks,
            warnings,
        };
    }

    if !apks.is_empty() {
        warnings.push(format!(
            "Both .aab and .apk files provided, using the .aab file(s): {}",
            join_paths(&bundles)
        ));
    }

    ResolvedApps {
        apps: bundles,
        warnings,
    }
}

/// Resolve the app inputs.
///
/// `apk_path` is the deprecated input; when present it takes precedence
/// over `app_path` and a deprecation warning is emitted.
///
/// # Errors
///
/// Returns [`InputError::NoApp`] if nothing usable remains.
pub fn resolve_apps(app_path: &str, apk_path: Option<&str>) -> Result<ResolvedApps, InputError> {
    let deprecated = apk_path.filter(|p| !p.trim().is_empty());

    let resolved = match deprecated {
        Some(apks) => {
            let mut resolved = classify(&split_list(apks));
            resolved.warnings.insert(
                0,
                "step input 'APK file path' (apk_path) is deprecated and will be removed, \
                 use 'APK or App Bundle file path' (app_path) instead!"
                    .to_string(),
            );
            resolved
        }
        None => classify(&split_list(app_path)),
    };

    if resolved.apps.is_empty() {
        return Err(InputError::NoApp);
    }
    Ok(resolved)
}

/// Parse the expansion-file input against the resolved apps.
///
/// Returns one slot per app (`None` for an empty entry), or an empty list
/// when no expansion files were configured.
///
/// # Errors
///
/// - [`InputError::ExpansionCountMismatch`] when the entry count differs
///   from the app count
/// - [`InputError::InvalidExpansionEntry`] for a non-empty entry without a
///   `main:`/`patch:` prefix
pub fn expansion_files(
    apps: &[AppArtifact],
    raw: &str,
) -> Result<Vec<Option<ExpansionFile>>, InputError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<&str> = raw.split(ENTRY_SEPARATOR).collect();
    if entries.len() != apps.len() {
        return Err(InputError::ExpansionCountMismatch {
            apps: apps.len(),
            entries: entries.len(),
        });
    }

    entries
        .into_iter()
        .map(|entry| {
            if entry.trim().is_empty() {
                Ok(None)
            } else {
                entry.parse().map(Some)
            }
        })
        .collect()
}

/// Pair a list of auxiliary files (mapping or symbol files) with the apps.
///
/// The list is split like app paths, see [`split_list`].
/// A single path applies to every app; several paths are paired by index
/// and must match the app count. Returns an empty list when nothing was
/// configured.
///
/// # Errors
///
/// Returns [`InputError::PairedCountMismatch`] when several paths are given
/// and their count differs from the app count.
pub fn paired_files(
    what: &'static str,
    apps: &[AppArtifact],
    raw: &str,
) -> Result<Vec<PathBuf>, InputError> {
    let paths: Vec<PathBuf> = split_list(raw).into_iter().map(PathBuf::from).collect();

    match paths.len() {
        0 => Ok(Vec::new()),
        1 => Ok(vec![paths[0].clone(); apps.len()]),
        n if n == apps.len() => Ok(paths),
        n => Err(InputError::PairedCountMismatch {
            what,
            apps: apps.len(),
            entries: n,
        }),
    }
}

/// Zip resolved apps and their auxiliary files into per-artifact records.
///
/// Expansion files paired with a bundle are dropped with a warning pushed
/// onto `warnings`; bundles do not support them.
pub fn build_records(
    apps: Vec<AppArtifact>,
    expansions: Vec<Option<ExpansionFile>>,
    mappings: Vec<PathBuf>,
    native_symbols: Vec<PathBuf>,
    warnings: &mut Vec<String>,
) -> Vec<ArtifactRecord> {
    let mut expansions = expansions.into_iter();
    let mut mappings = mappings.into_iter();
    let mut native_symbols = native_symbols.into_iter();

    apps.into_iter()
        .map(|app| {
            let mut expansion = expansions.next().flatten();
            if app.kind == AppKind::Bundle {
                if let Some(exp) = expansion.take() {
                    warnings.push(format!(
                        "expansion file ({}) ignored for app bundle: {}",
                        exp,
                        app.path.display()
                    ));
                }
            }
            ArtifactRecord {
                app,
                expansion,
                mapping: mappings.next(),
                native_symbols: native_symbols.next(),
            }
        })
        .collect()
}

fn join_paths(apps: &[AppArtifact]) -> String {
    apps.iter()
        .map(|a| a.path.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}
