//! Decides where the manifest and package of a publish come from.

use anyhow::Result;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::archive::{PackOptions, PackageResult, Packager, extract_manifest};
use crate::error::PublishError;
use crate::package::{BumpDirective, Manifest, version};
use crate::runtime::Runtime;

/// Inputs of a publish operation. Every path is explicit; nothing is read
/// from the process environment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PublishOptions {
    pub cwd: PathBuf,
    /// Publish this prebuilt archive instead of building one
    pub package_path: Option<PathBuf>,
    /// `major`, `minor`, `patch` or an explicit version
    pub version: Option<String>,
    pub base_content_url: Option<String>,
    pub base_images_url: Option<String>,
    pub pat: Option<String>,
}

/// Produce the manifest and archive to publish.
///
/// With a package path the manifest is read from inside that archive and the
/// packager is not involved. Otherwise the working-directory manifest is
/// optionally version-bumped, then packed into a fresh temporary file.
#[tracing::instrument(skip(runtime, packager, options), fields(cwd = ?options.cwd))]
pub async fn resolve_publish_source<R, P>(
    runtime: &R,
    packager: &P,
    options: &PublishOptions,
) -> Result<PackageResult>
where
    R: Runtime,
    P: Packager + ?Sized,
{
    if let Some(package_path) = &options.package_path {
        if options.version.is_some() {
            return Err(PublishError::Configuration("packagePath and version.".to_string()).into());
        }
        debug!("Using prebuilt package {:?}", package_path);
        let manifest = extract_manifest(runtime, package_path)?;
        return Ok(PackageResult {
            manifest,
            package_path: package_path.clone(),
        });
    }

    if let Some(directive) = &options.version {
        bump_manifest_version(runtime, &options.cwd, directive)?;
    }

    let package_path = runtime.temp_file_path(".vsix")?;
    debug!("Packing {:?} into {:?}", options.cwd, package_path);
    packager
        .pack(PackOptions {
            package_path,
            cwd: options.cwd.clone(),
            base_content_url: options.base_content_url.clone(),
            base_images_url: options.base_images_url.clone(),
        })
        .await
}

/// Apply a bump directive to the manifest in `cwd`.
///
/// Returns the new version, or `None` when it equals the current one, in
/// which case the manifest file is not touched.
pub fn bump_manifest_version<R: Runtime>(
    runtime: &R,
    cwd: &Path,
    directive: &str,
) -> Result<Option<String>> {
    let directive: BumpDirective = directive.parse()?;
    let mut manifest = Manifest::load(runtime, cwd, false)?;
    let next = version::bump(&manifest.version, &directive)?.to_string();

    if next == manifest.version {
        debug!("Version already {}, leaving manifest untouched", next);
        return Ok(None);
    }

    info!("Bumping {} from {} to {}", manifest.id(), manifest.version, next);
    manifest.version = next.clone();
    manifest.save(runtime, cwd)?;
    Ok(Some(next))
}
