//! Publish use case: resolve the source, check the gallery, then upload.

use anyhow::Result;
use log::{debug, info};
use std::path::Path;

use super::resolve_pat;
use super::source::{PublishOptions, resolve_publish_source};
use crate::archive::Packager;
use crate::error::{EXPIRED_PAT_HINT, PublishError};
use crate::gallery::{GalleryApi, GalleryConnector, GalleryError, flags};
use crate::package::Manifest;
use crate::runtime::Runtime;
use crate::store::CredentialStore;

/// Marker the gallery puts in errors caused by a revoked or expired token.
const INVALID_RESOURCE: &str = "Invalid Resource";

/// Upload `package_path` as `manifest`'s extension.
///
/// Issues exactly one lookup and at most one upload. A version the gallery
/// already lists is rejected without uploading. Malformed identity fields
/// are rejected before any gallery call, since they end up in request paths.
#[tracing::instrument(skip(api, manifest), fields(id = %manifest.full_id()))]
pub async fn publish_artifact<G>(api: &G, package_path: &Path, manifest: &Manifest) -> Result<()>
where
    G: GalleryApi + ?Sized,
{
    if manifest.uses_proposed_api() {
        return Err(PublishError::ProposedApiForbidden.into());
    }
    manifest.validate_identity()?;

    transfer(api, package_path, manifest)
        .await
        .map_err(with_credential_hint)
}

async fn transfer<G>(api: &G, package_path: &Path, manifest: &Manifest) -> Result<()>
where
    G: GalleryApi + ?Sized,
{
    let full_id = manifest.full_id();

    let existing = match api
        .get_extension(&manifest.publisher, &manifest.name, flags::INCLUDE_VERSIONS)
        .await
    {
        Ok(extension) => Some(extension),
        Err(e)
            if e.downcast_ref::<GalleryError>()
                .is_some_and(GalleryError::is_not_found) =>
        {
            debug!("{} is not in the gallery yet", manifest.id());
            None
        }
        Err(e) => return Err(e),
    };

    if existing
        .as_ref()
        .is_some_and(|ext| ext.has_version(&manifest.version))
    {
        return Err(PublishError::DuplicateVersion(full_id).into());
    }

    let uploaded = match existing {
        Some(_) => {
            info!("Updating {}", full_id);
            api.update_extension(package_path, &manifest.publisher, &manifest.name)
                .await
        }
        None => {
            info!("Creating {}", full_id);
            api.create_extension(package_path).await
        }
    };

    uploaded.map_err(|e| {
        if e.downcast_ref::<GalleryError>()
            .is_some_and(GalleryError::is_conflict)
        {
            PublishError::AlreadyExists(full_id).into()
        } else {
            e
        }
    })
}

/// Append the token renewal hint to errors that look like an expired token.
/// A gallery error keeps its kind; the hint is added to its message.
fn with_credential_hint(mut error: anyhow::Error) -> anyhow::Error {
    if !format!("{:#}", error).contains(INVALID_RESOURCE) {
        return error;
    }
    if let Some(gallery) = error.downcast_mut::<GalleryError>() {
        gallery.message_mut().push_str(EXPIRED_PAT_HINT);
        return error;
    }
    error.context(EXPIRED_PAT_HINT.trim_start().to_string())
}

/// Full publish: resolve the package, pick a token, upload.
///
/// Returns the manifest that was published.
pub async fn publish<R, P, S, C>(
    runtime: &R,
    packager: &P,
    store: &S,
    connector: &C,
    options: &PublishOptions,
) -> Result<Manifest>
where
    R: Runtime,
    P: Packager + ?Sized,
    S: CredentialStore + ?Sized,
    C: GalleryConnector + ?Sized,
{
    let source = resolve_publish_source(runtime, packager, options).await?;
    let manifest = source.manifest;

    let pat = resolve_pat(store, options.pat.as_deref(), &manifest.publisher)?;
    let api = connector.connect(&pat)?;
    publish_artifact(api.as_ref(), &source.package_path, &manifest).await?;

    info!("Published {}", manifest.full_id());
    Ok(manifest)
}
