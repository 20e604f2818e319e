use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Method, RequestBuilder, Response};
use std::path::Path;

use super::error::GalleryError;
use super::{
    ExtensionQuery, GalleryApi, GalleryConnector, PublishedExtension, QueryResponse,
};

pub const DEFAULT_GALLERY_URL: &str = "https://marketplace.visualstudio.com";

const API_ACCEPT: &str = "application/json;api-version=3.0-preview.1";

/// HTTP client for the gallery REST API, authenticated with a Personal Access Token.
pub struct Gallery {
    client: Client,
    url: String,
    pat: String,
}

impl Gallery {
    #[tracing::instrument(skip(client, pat))]
    pub fn new(client: Client, url: &str, pat: &str) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            pat: pat.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.url, path))
            .basic_auth("oauth", Some(&self.pat))
            .header(ACCEPT, API_ACCEPT)
    }

    fn extension_path(publisher: &str, name: &str) -> String {
        format!("/_apis/gallery/publishers/{}/extensions/{}", publisher, name)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .context("Failed to send request to gallery")?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("Gallery responded {}: {}", status, body);
        Err(GalleryError::from_response(status, &body).into())
    }

    /// Attach a package archive as a streamed octet-stream body.
    async fn with_package(request: RequestBuilder, package_path: &Path) -> Result<RequestBuilder> {
        let file = tokio::fs::File::open(package_path)
            .await
            .with_context(|| format!("Failed to open package {:?}", package_path))?;
        let length = file
            .metadata()
            .await
            .with_context(|| format!("Failed to read metadata of {:?}", package_path))?
            .len();

        debug!("Uploading {:?} ({} bytes)", package_path, length);
        Ok(request
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .body(Body::from(file)))
    }
}

#[async_trait]
impl GalleryApi for Gallery {
    #[tracing::instrument(skip(self))]
    async fn get_extension(
        &self,
        publisher: &str,
        name: &str,
        flags: u32,
    ) -> Result<PublishedExtension> {
        let request = self
            .request(Method::GET, &Self::extension_path(publisher, name))
            .query(&[("flags", flags.to_string())]);
        let response = self.send(request).await?;
        response
            .json::<PublishedExtension>()
            .await
            .context("Failed to parse extension from gallery")
    }

    #[tracing::instrument(skip(self))]
    async fn create_extension(&self, package_path: &Path) -> Result<()> {
        let request = self.request(Method::POST, "/_apis/gallery/extensions");
        let request = Self::with_package(request, package_path).await?;
        self.send(request).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_extension(
        &self,
        package_path: &Path,
        publisher: &str,
        name: &str,
    ) -> Result<()> {
        let request = self.request(Method::PUT, &Self::extension_path(publisher, name));
        let request = Self::with_package(request, package_path).await?;
        self.send(request).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_extension(&self, publisher: &str, name: &str) -> Result<()> {
        let request = self.request(Method::DELETE, &Self::extension_path(publisher, name));
        self.send(request).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, query))]
    async fn query_extensions(&self, query: &ExtensionQuery) -> Result<Vec<PublishedExtension>> {
        let request = self
            .request(Method::POST, "/_apis/public/gallery/extensionquery")
            .json(query);
        let response = self.send(request).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .context("Failed to parse extension query response")?;

        Ok(parsed
            .results
            .into_iter()
            .flat_map(|r| r.extensions)
            .collect())
    }
}

/// Creates [`Gallery`] clients that share one reqwest connection pool.
#[derive(Clone)]
pub struct HttpGalleryConnector {
    client: Client,
    url: String,
}

impl HttpGalleryConnector {
    pub fn new(client: Client, url: Option<String>) -> Self {
        let url = url.unwrap_or_else(|| DEFAULT_GALLERY_URL.to_string());
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl GalleryConnector for HttpGalleryConnector {
    fn connect(&self, pat: &str) -> Result<Box<dyn GalleryApi>> {
        Ok(Box::new(Gallery::new(self.client.clone(), &self.url, pat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{FilterCriteria, QueryFilter, filter_type, flags};
    use mockito::Matcher;
    use tempfile::tempdir;

    // base64("oauth:secret")
    const AUTH: &str = "Basic b2F1dGg6c2VjcmV0";

    fn gallery(url: &str) -> Gallery {
        Gallery::new(Client::new(), url, "secret")
    }

    fn kind(err: &anyhow::Error) -> Option<&GalleryError> {
        err.downcast_ref::<GalleryError>()
    }

    #[tokio::test]
    async fn test_get_extension() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/_apis/gallery/publishers/acme/extensions/tool")
            .match_query(Matcher::UrlEncoded("flags".into(), "1".into()))
            .match_header("authorization", AUTH)
            .match_header("accept", API_ACCEPT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"extensionName":"tool","publisher":{"publisherName":"acme"},"versions":[{"version":"1.0.0"}]}"#,
            )
            .create_async()
            .await;

        let ext = gallery(&server.url())
            .get_extension("acme", "tool", flags::INCLUDE_VERSIONS)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(ext.extension_name, "tool");
        assert!(ext.has_version("1.0.0"));
    }

    #[tokio::test]
    async fn test_get_extension_not_found() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/_apis/gallery/publishers/acme/extensions/tool")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Extension not found"}"#)
            .create_async()
            .await;

        let err = gallery(&server.url())
            .get_extension("acme", "tool", flags::INCLUDE_VERSIONS)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(
            kind(&err),
            Some(&GalleryError::NotFound("Extension not found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_create_extension_streams_package() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let package = dir.path().join("tool.vsix");
        std::fs::write(&package, b"PK-archive-bytes").unwrap();

        let mock = server
            .mock("POST", "/_apis/gallery/extensions")
            .match_header("authorization", AUTH)
            .match_header("content-type", "application/octet-stream")
            .match_body("PK-archive-bytes")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;

        gallery(&server.url())
            .create_extension(&package)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_extension_conflict() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempdir().unwrap();
        let package = dir.path().join("tool.vsix");
        std::fs::write(&package, b"bytes").unwrap();

        let mock = server
            .mock("PUT", "/_apis/gallery/publishers/acme/extensions/tool")
            .match_body("bytes")
            .with_status(409)
            .create_async()
            .await;

        let err = gallery(&server.url())
            .update_extension(&package, "acme", "tool")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(kind(&err).is_some_and(GalleryError::is_conflict));
    }

    #[tokio::test]
    async fn test_upload_missing_package_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/_apis/gallery/extensions")
            .expect(0)
            .create_async()
            .await;

        let result = gallery(&server.url())
            .create_extension(Path::new("/nonexistent/tool.vsix"))
            .await;

        mock.assert_async().await;
        assert!(result.unwrap_err().to_string().contains("Failed to open package"));
    }

    #[tokio::test]
    async fn test_delete_extension() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("DELETE", "/_apis/gallery/publishers/acme/extensions/tool")
            .match_header("authorization", AUTH)
            .with_status(200)
            .create_async()
            .await;

        gallery(&server.url())
            .delete_extension("acme", "tool")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_extensions_flattens_results() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/_apis/public/gallery/extensionquery")
            .match_body(Matcher::PartialJsonString(
                r#"{"flags":512,"filters":[{"criteria":[{"filterType":8,"value":"Microsoft.VisualStudio.Code"}]}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[
                    {"extensions":[{"extensionName":"a","publisher":{"publisherName":"acme"},"versions":[{"version":"1.0.0"}]}]},
                    {"extensions":[{"extensionName":"b","publisher":{"publisherName":"acme"},"versions":[{"version":"2.0.0"}]}]}
                ]}"#,
            )
            .create_async()
            .await;

        let query = ExtensionQuery {
            filters: vec![QueryFilter {
                criteria: vec![FilterCriteria {
                    filter_type: filter_type::INSTALLATION_TARGET,
                    value: "Microsoft.VisualStudio.Code".to_string(),
                }],
                ..Default::default()
            }],
            flags: flags::INCLUDE_LATEST_VERSION_ONLY,
        };
        let extensions = gallery(&server.url())
            .query_extensions(&query)
            .await
            .unwrap();

        mock.assert_async().await;
        let names: Vec<_> = extensions.iter().map(|e| e.extension_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_connector_uses_configured_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/_apis/gallery/publishers/acme/extensions/tool")
            .match_header("authorization", AUTH)
            .with_status(204)
            .create_async()
            .await;

        let connector = HttpGalleryConnector::new(Client::new(), Some(format!("{}/", server.url())));
        let api = connector.connect("secret").unwrap();
        api.delete_extension("acme", "tool").await.unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn test_connector_default_url() {
        let connector = HttpGalleryConnector::new(Client::new(), None);
        assert_eq!(connector.url(), DEFAULT_GALLERY_URL);
    }
}
