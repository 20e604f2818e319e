//! Gallery (extension registry) API.
//!
//! The [`GalleryApi`] trait is the seam the publish pipeline talks through;
//! [`Gallery`] implements it over HTTP.

mod client;
mod error;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use client::{DEFAULT_GALLERY_URL, Gallery, HttpGalleryConnector};
pub use error::GalleryError;

/// Installation target of VS Code extensions, in packages and gallery queries.
pub const VSCODE_TARGET: &str = "Microsoft.VisualStudio.Code";

/// Bits for the `flags` argument of extension queries.
pub mod flags {
    pub const INCLUDE_VERSIONS: u32 = 0x1;
    pub const INCLUDE_LATEST_VERSION_ONLY: u32 = 0x200;
}

/// Criteria kinds understood by `extensionquery`.
pub mod filter_type {
    pub const INSTALLATION_TARGET: u32 = 8;
    pub const PUBLISHER_NAME: u32 = 18;
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublisherRef {
    #[serde(default)]
    pub publisher_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionVersion {
    pub version: String,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// The gallery's view of a published extension.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublishedExtension {
    #[serde(default)]
    pub extension_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub publisher: PublisherRef,
    /// Newest first, as returned by the gallery
    #[serde(default)]
    pub versions: Vec<ExtensionVersion>,
}

impl PublishedExtension {
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v.version == version)
    }

    pub fn latest_version(&self) -> Option<&str> {
        self.versions.first().map(|v| v.version.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub filter_type: u32,
    pub value: String,
}

/// Paging direction for query filters.
pub mod direction {
    pub const BACKWARD: u32 = 1;
    pub const FORWARD: u32 = 2;
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub criteria: Vec<FilterCriteria>,
    pub direction: u32,
    pub page_number: u32,
    pub page_size: u32,
    pub sort_by: u32,
    pub sort_order: u32,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            criteria: Vec::new(),
            direction: direction::FORWARD,
            page_number: 1,
            page_size: 1000,
            sort_by: 0,
            sort_order: 0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionQuery {
    pub filters: Vec<QueryFilter>,
    pub flags: u32,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub results: Vec<QueryResult>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct QueryResult {
    #[serde(default)]
    pub extensions: Vec<PublishedExtension>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GalleryApi: Send + Sync {
    /// Fetch one extension. A missing extension fails with [`GalleryError::NotFound`].
    async fn get_extension(
        &self,
        publisher: &str,
        name: &str,
        flags: u32,
    ) -> Result<PublishedExtension>;

    /// Upload a package for an extension the gallery has not seen yet.
    async fn create_extension(&self, package_path: &Path) -> Result<()>;

    /// Upload a new version of an existing extension.
    async fn update_extension(&self, package_path: &Path, publisher: &str, name: &str)
    -> Result<()>;

    async fn delete_extension(&self, publisher: &str, name: &str) -> Result<()>;

    /// Run a query; results from every result set are concatenated.
    async fn query_extensions(&self, query: &ExtensionQuery) -> Result<Vec<PublishedExtension>>;
}

/// Builds a gallery client authenticated with a token.
#[cfg_attr(test, mockall::automock)]
pub trait GalleryConnector: Send + Sync {
    fn connect(&self, pat: &str) -> Result<Box<dyn GalleryApi>>;
}
