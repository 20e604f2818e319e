use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::error::PublishError;
use crate::package::Manifest;
use crate::runtime::Runtime;

/// Location of the manifest inside a package archive, compared case-insensitively.
pub const ARCHIVE_MANIFEST_PATH: &str = "extension/package.json";

/// Read the manifest embedded in a package archive.
///
/// Entries are enumerated in archive order; every entry name is checked so an
/// archive carrying two matching entries is rejected instead of silently
/// picking one. Only the matching entry is decompressed.
#[tracing::instrument(skip(runtime))]
pub fn extract_manifest<R: Runtime>(runtime: &R, package_path: &Path) -> Result<Manifest> {
    let display = package_path.display().to_string();
    let open_error = |reason: String| PublishError::ArchiveOpen {
        path: display.clone(),
        reason,
    };

    let file = runtime
        .open(package_path)
        .map_err(|e| open_error(format!("{:#}", e)))?;
    let mut archive = ZipArchive::new(file).map_err(|e| open_error(e.to_string()))?;

    debug!("Scanning {} entries in {}", archive.len(), display);

    let mut found: Option<usize> = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .with_context(|| format!("Failed to read entry {} of {}", i, display))?;
        if !entry.name().eq_ignore_ascii_case(ARCHIVE_MANIFEST_PATH) {
            continue;
        }
        if found.replace(i).is_some() {
            return Err(PublishError::AmbiguousManifest(display).into());
        }
    }

    let index = found.ok_or_else(|| PublishError::ManifestNotFound(display.clone()))?;

    let mut entry = archive
        .by_index(index)
        .with_context(|| format!("Failed to read entry {} of {}", index, display))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read {} from {}", entry.name(), display))?;

    let content = String::from_utf8(bytes)
        .map_err(|e| PublishError::ManifestParse(format!("not UTF-8: {}", e)))?;
    Manifest::from_json(&content)
}
