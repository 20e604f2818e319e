//! Application layer - the publish, list and unpublish use cases.
//!
//! Each use case takes its collaborators (runtime, packager, credential store,
//! gallery connector) explicitly, so the CLI layer decides what is real.

mod list;
mod publish;
mod source;
mod unpublish;

use anyhow::Result;
use log::debug;

use crate::store::CredentialStore;

pub use list::{ExtensionSummary, list_extensions, publisher_query};
pub use publish::{publish, publish_artifact};
pub use source::{PublishOptions, bump_manifest_version, resolve_publish_source};
pub use unpublish::{ExtensionId, UnpublishOptions, unpublish};

/// Pick the token for `publisher`: an explicit one wins, otherwise the store.
pub fn resolve_pat<S>(store: &S, explicit: Option<&str>, publisher: &str) -> Result<String>
where
    S: CredentialStore + ?Sized,
{
    if let Some(pat) = explicit.filter(|p| !p.is_empty()) {
        debug!("Using token given on the command line");
        return Ok(pat.to_string());
    }
    Ok(store.get_publisher(publisher)?.pat)
}
