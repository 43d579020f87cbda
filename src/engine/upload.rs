//! engine::upload
//!
//! Uploads every artifact of the run into an open edit.
//!
//! Per artifact, in order:
//! 1. the APK or bundle, which yields its version code
//! 2. the expansion file (APKs only)
//! 3. the mapping file, as a `proguard` deobfuscation file
//! 4. the native symbols archive, as a `nativeCode` deobfuscation file
//!
//! Deobfuscation files are skipped when the service reports version code 0,
//! since there is nothing to attach them to.

use std::path::Path;

use bytes::Bytes;

use super::DeployError;
use crate::core::config::Config;
use crate::core::inputs::{AppKind, ArtifactRecord};
use crate::core::types::{duplicate_version_codes, VersionCode};
use crate::publisher::{DeobfuscationKind, Publisher};
use crate::ui::output;

/// Read a whole file for upload.
pub async fn read_file(what: &'static str, path: &Path) -> Result<Bytes, DeployError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|source| DeployError::ReadFile {
            what,
            path: path.to_path_buf(),
            source,
        })
}

/// Upload all artifacts and return their version codes in input order.
pub async fn upload_artifacts(
    publisher: &dyn Publisher,
    edit_id: &str,
    config: &Config,
) -> Result<Vec<VersionCode>, DeployError> {
    let mut version_codes = Vec::with_capacity(config.artifacts.len());
    for record in &config.artifacts {
        let code = upload_artifact(publisher, edit_id, record, config).await?;
        version_codes.push(code);
    }

    let duplicates = duplicate_version_codes(&version_codes);
    if !duplicates.is_empty() {
        output::warn(format!(
            "uploaded artifacts share version codes: {:?}",
            duplicates
        ));
    }
    Ok(version_codes)
}

async fn upload_artifact(
    publisher: &dyn Publisher,
    edit_id: &str,
    record: &ArtifactRecord,
    config: &Config,
) -> Result<VersionCode, DeployError> {
    let app = &record.app;
    let content = read_file("app", &app.path).await?;
    tracing::debug!(path = %app.path.display(), size = content.len(), kind = %app.kind, "uploading app");

    let uploaded = match app.kind {
        AppKind::Apk => publisher
            .upload_apk(edit_id, content)
            .await
            .map_err(DeployError::publisher("upload apk"))?,
        AppKind::Bundle => publisher
            .upload_bundle(edit_id, content, config.ack_bundle_installation_warning)
            .await
            .map_err(DeployError::publisher("upload app bundle"))?,
    };
    let code = uploaded.version_code;
    output::print(format!("Uploaded {} version: {}", app.kind, code));
    if let Some(sha256) = &uploaded.sha256 {
        tracing::debug!(version_code = code, sha256 = %sha256, "upload digest");
    }

    if let Some(expansion) = &record.expansion {
        let content = read_file("expansion file", &expansion.path).await?;
        publisher
            .upload_expansion_file(edit_id, code, expansion.slot, content)
            .await
            .map_err(DeployError::publisher("upload expansion file"))?;
        output::print(format!("Uploaded expansion file {}", expansion));
    }

    let deobfuscation = [
        (record.mapping.as_deref(), DeobfuscationKind::Proguard, "mapping file"),
        (
            record.native_symbols.as_deref(),
            DeobfuscationKind::NativeCode,
            "native symbols file",
        ),
    ];
    for (path, kind, what) in deobfuscation {
        let Some(path) = path else { continue };
        if code == 0 {
            output::warn(format!(
                "{} ({}) not uploaded, the artifact has no version code",
                what,
                path.display()
            ));
            continue;
        }
        let content = read_file(what, path).await?;
        publisher
            .upload_deobfuscation_file(edit_id, code, kind, content)
            .await
            .map_err(DeployError::publisher("upload deobfuscation file"))?;
        output::print(format!("Uploaded {} for version {}", what, code));
    }

    Ok(code)
}
