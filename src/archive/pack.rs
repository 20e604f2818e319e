use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::gallery::VSCODE_TARGET;
use crate::package::Manifest;
use crate::runtime::Runtime;

/// Inputs for building a package archive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackOptions {
    pub package_path: PathBuf,
    pub cwd: PathBuf,
    pub base_content_url: Option<String>,
    pub base_images_url: Option<String>,
}

/// A manifest paired with the archive it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageResult {
    pub manifest: Manifest,
    pub package_path: PathBuf,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Packager: Send + Sync {
    /// Write an archive to `options.package_path` and return the manifest it embeds.
    async fn pack(&self, options: PackOptions) -> Result<PackageResult>;
}

/// Builds `.vsix` archives from a working directory.
pub struct ZipPackager<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> ZipPackager<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Relative paths (with `/` separators) of every file that goes under `extension/`.
    fn collect_files(&self, cwd: &Path, exclude: &Path) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![cwd.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for path in self.runtime.read_dir(&dir)? {
                if path == exclude || is_ignored(&path) {
                    continue;
                }
                if self.runtime.is_dir(&path) {
                    pending.push(path);
                    continue;
                }
                let relative = path
                    .strip_prefix(cwd)
                    .with_context(|| format!("{:?} is outside {:?}", path, cwd))?;
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push(relative);
            }
        }

        files.sort();
        Ok(files)
    }

    fn build(&self, manifest: &Manifest, options: &PackOptions) -> Result<Vec<u8>> {
        let files = self.collect_files(&options.cwd, &options.package_path)?;
        debug!("Packaging {} file(s) from {:?}", files.len(), options.cwd);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", deflated)?;
        zip.write_all(content_types(&files).as_bytes())?;

        zip.start_file("extension.vsixmanifest", deflated)?;
        zip.write_all(vsix_manifest(manifest).as_bytes())?;

        for relative in &files {
            let source = options.cwd.join(relative);
            let mut content = self.read_bytes(&source)?;
            if relative.eq_ignore_ascii_case("readme.md") {
                let text = String::from_utf8_lossy(&content);
                content = rewrite_relative_links(
                    &text,
                    options.base_content_url.as_deref(),
                    options.base_images_url.as_deref(),
                )
                .into_bytes();
            }
            zip.start_file(format!("extension/{}", relative), deflated)?;
            zip.write_all(&content)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let mut reader = self.runtime.open(path)?;
        let mut buffer = Vec::new();
        std::io::Read::read_to_end(&mut reader, &mut buffer)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(buffer)
    }
}

#[async_trait]
impl<'a, R: Runtime> Packager for ZipPackager<'a, R> {
    #[tracing::instrument(skip(self))]
    async fn pack(&self, options: PackOptions) -> Result<PackageResult> {
        let manifest = Manifest::load(self.runtime, &options.cwd, true)?;
        let bytes = self.build(&manifest, &options)?;

        self.runtime
            .write(&options.package_path, &bytes)
            .with_context(|| format!("Failed to write package {:?}", options.package_path))?;
        info!(
            "Packaged {} ({} bytes) to {:?}",
            manifest.full_id(),
            bytes.len(),
            options.package_path
        );

        Ok(PackageResult {
            manifest,
            package_path: options.package_path,
        })
    }
}

fn is_ignored(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return true,
    };
    name.starts_with('.')
        || name == "node_modules"
        || name.to_ascii_lowercase().ends_with(".vsix")
        || name.ends_with(".tmp")
}

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)([^)]*)\)").expect("valid link regex")
});

static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w[\w+.-]*:").expect("valid scheme regex"));

/// Rewrite relative markdown links to absolute ones.
///
/// Images use `base_images_url` when given, otherwise `base_content_url`.
/// Anchors and links that already carry a scheme are left alone.
pub fn rewrite_relative_links(
    markdown: &str,
    base_content_url: Option<&str>,
    base_images_url: Option<&str>,
) -> String {
    if base_content_url.is_none() && base_images_url.is_none() {
        return markdown.to_string();
    }

    MARKDOWN_LINK
        .replace_all(markdown, |caps: &Captures| {
            let is_image = !caps[1].is_empty();
            let link = &caps[3];
            let base = if is_image {
                base_images_url.or(base_content_url)
            } else {
                base_content_url
            };
            match base {
                Some(base) if !link.starts_with('#') && !URL_SCHEME.is_match(link) => format!(
                    "{}[{}]({}{})",
                    &caps[1],
                    &caps[2],
                    join_url(base, link),
                    &caps[4]
                ),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn join_url(base: &str, link: &str) -> String {
    let link = link.trim_start_matches("./").trim_start_matches('/');
    format!("{}/{}", base.trim_end_matches('/'), link)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn vsix_manifest(manifest: &Manifest) -> String {
    let display_name = manifest.display_name.as_deref().unwrap_or(&manifest.name);
    let description = manifest.description.as_deref().unwrap_or("");
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<PackageManifest Version="2.0.0" xmlns="http://schemas.microsoft.com/developer/vsx-schema/2011" xmlns:d="http://schemas.microsoft.com/developer/vsx-schema-design/2011">
  <Metadata>
    <Identity Language="en-US" Id="{name}" Version="{version}" Publisher="{publisher}" />
    <DisplayName>{display_name}</DisplayName>
    <Description xml:space="preserve">{description}</Description>
  </Metadata>
  <Installation>
    <InstallationTarget Id="{target}" />
  </Installation>
  <Dependencies />
  <Assets>
    <Asset Type="Microsoft.VisualStudio.Code.Manifest" Path="extension/package.json" Addressable="true" />
  </Assets>
</PackageManifest>
"#,
        name = escape_xml(&manifest.name),
        version = escape_xml(&manifest.version),
        publisher = escape_xml(&manifest.publisher),
        display_name = escape_xml(display_name),
        description = escape_xml(description),
        target = VSCODE_TARGET,
    )
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "json" => "application/json",
        "js" => "application/javascript",
        "md" => "text/markdown",
        "txt" => "text/plain",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "vsixmanifest" | "xml" => "text/xml",
        _ => "application/octet-stream",
    }
}

fn content_types(files: &[String]) -> String {
    let mut extensions: BTreeSet<String> = files
        .iter()
        .filter_map(|f| Path::new(f).extension())
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .collect();
    extensions.insert("vsixmanifest".to_string());

    let defaults: String = extensions
        .iter()
        .map(|e| {
            format!(
                r#"<Default Extension=".{}" ContentType="{}"/>"#,
                escape_xml(e),
                content_type_for(e)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">{}</Types>"#,
        defaults
    )
}
