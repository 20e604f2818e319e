use anyhow::Result;
use log::debug;
use std::fmt;

use super::resolve_pat;
use crate::gallery::{
    ExtensionQuery, FilterCriteria, GalleryConnector, QueryFilter, VSCODE_TARGET, filter_type,
    flags,
};
use crate::package::validate_publisher;
use crate::store::CredentialStore;

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSummary {
    pub name: String,
    pub version: String,
}

impl fmt::Display for ExtensionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.version)
    }
}

/// Query for the latest version of every VS Code extension of `publisher`.
pub fn publisher_query(publisher: &str) -> ExtensionQuery {
    ExtensionQuery {
        filters: vec![QueryFilter {
            criteria: vec![
                FilterCriteria {
                    filter_type: filter_type::INSTALLATION_TARGET,
                    value: VSCODE_TARGET.to_string(),
                },
                FilterCriteria {
                    filter_type: filter_type::PUBLISHER_NAME,
                    value: publisher.to_string(),
                },
            ],
            ..Default::default()
        }],
        flags: flags::INCLUDE_LATEST_VERSION_ONLY,
    }
}

/// List the extensions the gallery holds for `publisher`, using its stored token.
#[tracing::instrument(skip(store, connector))]
pub async fn list_extensions<S, C>(
    store: &S,
    connector: &C,
    publisher: &str,
) -> Result<Vec<ExtensionSummary>>
where
    S: CredentialStore + ?Sized,
    C: GalleryConnector + ?Sized,
{
    validate_publisher(publisher)?;
    let pat = resolve_pat(store, None, publisher)?;
    let api = connector.connect(&pat)?;

    let extensions = api.query_extensions(&publisher_query(publisher)).await?;
    debug!("Gallery returned {} extension(s)", extensions.len());

    // The server filter is not trusted on its own.
    Ok(extensions
        .into_iter()
        .filter(|ext| ext.publisher.publisher_name == publisher)
        .map(|ext| ExtensionSummary {
            version: ext.latest_version().unwrap_or_default().to_string(),
            name: ext.extension_name,
        })
        .collect())
}
