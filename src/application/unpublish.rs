use anyhow::Result;
use log::{debug, info};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::resolve_pat;
use crate::error::PublishError;
use crate::gallery::GalleryConnector;
use crate::package::Manifest;
use crate::runtime::Runtime;
use crate::store::CredentialStore;

/// `publisher.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionId {
    pub publisher: String,
    pub name: String,
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.publisher, self.name)
    }
}

impl FromStr for ExtensionId {
    type Err = anyhow::Error;

    /// Splits on the first `.`; the name may contain further dots.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((publisher, name)) if !publisher.is_empty() && !name.is_empty() => {
                Ok(ExtensionId {
                    publisher: publisher.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(PublishError::InvalidExtensionId(s.to_string()).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnpublishOptions {
    /// Explicit `publisher.name`; the manifest in `cwd` is used when absent
    pub id: Option<String>,
    pub cwd: PathBuf,
    pub pat: Option<String>,
}

fn resolve_id<R: Runtime>(runtime: &R, options: &UnpublishOptions) -> Result<ExtensionId> {
    if let Some(id) = &options.id {
        return id.parse();
    }
    let manifest = Manifest::load(runtime, &options.cwd, false)?;
    manifest.require_identity()?;
    Ok(ExtensionId {
        publisher: manifest.publisher,
        name: manifest.name,
    })
}

/// Delete an extension from the gallery after interactive confirmation.
///
/// Anything but `y`/`Y` aborts with [`PublishError::UserAborted`] before any
/// credential lookup or gallery call.
#[tracing::instrument(skip(runtime, store, connector, options), fields(id = ?options.id))]
pub async fn unpublish<R, S, C>(
    runtime: &R,
    store: &S,
    connector: &C,
    options: &UnpublishOptions,
) -> Result<ExtensionId>
where
    R: Runtime,
    S: CredentialStore + ?Sized,
    C: GalleryConnector + ?Sized,
{
    let id = resolve_id(runtime, options)?;

    let answer = runtime.prompt(&format!(
        "This will FOREVER delete '{}'! Are you sure? [y/N] ",
        id
    ))?;
    if !answer.eq_ignore_ascii_case("y") {
        debug!("Unpublish of {} declined with {:?}", id, answer);
        return Err(PublishError::UserAborted.into());
    }

    let pat = resolve_pat(store, options.pat.as_deref(), &id.publisher)?;
    let api = connector.connect(&pat)?;
    api.delete_extension(&id.publisher, &id.name).await?;

    info!("Unpublished {}", id);
    Ok(id)
}
