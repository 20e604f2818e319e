use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::version::parse_loose;
use crate::error::PublishError;
use crate::runtime::Runtime;

/// File name of the manifest inside a working directory.
pub const MANIFEST_FILE: &str = "package.json";

/// Extension manifest (`package.json`).
///
/// Only identity and capability fields are typed; everything else is carried
/// through `extra`. The parsed document is kept alongside, so a write-back
/// keeps the file's key order and explicit `null`s.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_proposed_api: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    document: Map<String, Value>,
}

impl Manifest {
    /// Build a manifest with just the identity fields set.
    pub fn new(publisher: &str, name: &str, version: &str) -> Self {
        Manifest {
            publisher: publisher.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    /// Path of the manifest file inside `cwd`.
    pub fn path_in(cwd: &Path) -> PathBuf {
        cwd.join(MANIFEST_FILE)
    }

    /// `publisher.name`
    pub fn id(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }

    /// `publisher.name@version`
    pub fn full_id(&self) -> String {
        format!("{}@{}", self.id(), self.version)
    }

    pub fn uses_proposed_api(&self) -> bool {
        self.enable_proposed_api.unwrap_or(false)
    }

    /// Parse manifest JSON. A leading UTF-8 byte order mark is ignored.
    pub fn from_json(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let document: Map<String, Value> = serde_json::from_str(content)
            .map_err(|e| PublishError::ManifestParse(e.to_string()))?;
        let mut manifest: Manifest = serde_json::from_value(Value::Object(document.clone()))
            .map_err(|e| PublishError::ManifestParse(e.to_string()))?;
        manifest.document = document;
        Ok(manifest)
    }

    /// The JSON object written back to disk.
    ///
    /// Keys keep their position in the parsed document and new keys go last.
    /// Keys the typed view no longer produces are dropped, except explicit
    /// `null`s, which serialize as absent.
    pub fn to_document(&self) -> Result<Map<String, Value>> {
        let fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            other => anyhow::bail!("Manifest serialized to a non-object: {}", other),
        };
        let mut document = self.document.clone();
        document.retain(|key, value| value.is_null() || fields.contains_key(key));
        for (key, value) in fields {
            document.insert(key, value);
        }
        Ok(document)
    }

    /// Load the manifest from a working directory.
    ///
    /// With `strict`, the manifest must also be publishable: see [`Manifest::validate`].
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, cwd: &Path, strict: bool) -> Result<Self> {
        let path = Self::path_in(cwd);
        debug!("Reading manifest from {:?}", path);
        let content = runtime
            .read_to_string(&path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        let manifest = Self::from_json(&content)?;
        if strict {
            manifest.validate()?;
        }
        Ok(manifest)
    }

    /// Write the manifest back to a working directory.
    ///
    /// The new content goes to a sibling temp file that is then renamed over
    /// the original, so an interrupted write leaves the old manifest intact.
    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, cwd: &Path) -> Result<()> {
        let path = Self::path_in(cwd);
        let tmp = cwd.join(format!("{}.tmp", MANIFEST_FILE));
        let mut content = serde_json::to_string_pretty(&self.to_document()?)?;
        content.push('\n');

        debug!("Writing manifest to {:?}", path);
        runtime.write(&tmp, content.as_bytes())?;
        if let Err(e) = runtime.rename(&tmp, &path) {
            let _ = runtime.remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to replace manifest {:?}", path));
        }
        Ok(())
    }

    /// Identity checks shared by every caller that talks to the gallery.
    pub fn require_identity(&self) -> Result<()> {
        if self.publisher.trim().is_empty() {
            return Err(PublishError::MissingManifestField("publisher").into());
        }
        if self.name.trim().is_empty() {
            return Err(PublishError::MissingManifestField("name").into());
        }
        if self.version.trim().is_empty() {
            return Err(PublishError::MissingManifestField("version").into());
        }
        Ok(())
    }

    /// Identity fields are present and well formed: names are identifiers
    /// and the version is semver.
    pub fn validate_identity(&self) -> Result<()> {
        self.require_identity()?;
        validate_publisher(&self.publisher)?;
        validate_extension_name(&self.name)?;
        if parse_loose(&self.version).is_none() {
            return Err(PublishError::InvalidVersion(self.version.clone()).into());
        }
        Ok(())
    }

    /// Checks applied when reading a manifest for a fresh build.
    pub fn validate(&self) -> Result<()> {
        self.validate_identity()?;
        let has_vscode_engine = self
            .engines
            .as_ref()
            .and_then(|e| e.get("vscode"))
            .and_then(Value::as_str)
            .is_some_and(|v| !v.trim().is_empty());
        if !has_vscode_engine {
            return Err(PublishError::MissingManifestField("engines.vscode").into());
        }
        Ok(())
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Publisher names: a letter or digit followed by letters, digits or dashes.
pub fn validate_publisher(publisher: &str) -> Result<()> {
    if !is_identifier(publisher) {
        return Err(PublishError::InvalidName {
            kind: "publisher",
            value: publisher.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Extension names follow the same shape as publisher names.
pub fn validate_extension_name(name: &str) -> Result<()> {
    if !is_identifier(name) {
        return Err(PublishError::InvalidName {
            kind: "extension",
            value: name.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
  "name": "tool",
  "displayName": "Tool",
  "version": "1.2.3",
  "publisher": "acme",
  "engines": { "vscode": "^1.50.0" },
  "main": "./out/extension.js",
  "contributes": { "commands": [] },
  "activationEvents": ["*"]
}"#;

    fn kind(err: &anyhow::Error) -> Option<&PublishError> {
        err.downcast_ref::<PublishError>()
    }

    #[test]
    fn test_from_json_typed_and_extra_fields() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        assert_eq!(manifest.publisher, "acme");
        assert_eq!(manifest.name, "tool");
        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(manifest.display_name.as_deref(), Some("Tool"));
        assert!(!manifest.uses_proposed_api());
        assert_eq!(
            manifest.extra.keys().collect::<Vec<_>>(),
            vec!["main", "contributes", "activationEvents"]
        );
    }

    #[test]
    fn test_from_json_strips_bom() {
        let content = format!("\u{feff}{}", SAMPLE);
        assert!(Manifest::from_json(&content).is_ok());
    }

    #[test]
    fn test_from_json_malformed() {
        let err = Manifest::from_json("{ not json").unwrap_err();
        assert!(matches!(kind(&err), Some(PublishError::ManifestParse(_))));
    }

    #[test]
    fn test_ids() {
        let manifest = Manifest::new("acme", "tool", "1.0.0");
        assert_eq!(manifest.id(), "acme.tool");
        assert_eq!(manifest.full_id(), "acme.tool@1.0.0");
    }

    #[test]
    fn test_proposed_api_flag() {
        let manifest =
            Manifest::from_json(r#"{"publisher":"a","name":"b","version":"1.0.0","enableProposedApi":true}"#)
                .unwrap();
        assert!(manifest.uses_proposed_api());
    }

    #[test]
    fn test_validate_accepts_sample() {
        Manifest::from_json(SAMPLE).unwrap().validate().unwrap();
    }

    #[test]
    fn test_validate_missing_fields() {
        let mut manifest = Manifest::from_json(SAMPLE).unwrap();
        manifest.publisher.clear();
        let err = manifest.validate().unwrap_err();
        assert_eq!(kind(&err), Some(&PublishError::MissingManifestField("publisher")));

        let mut manifest = Manifest::from_json(SAMPLE).unwrap();
        manifest.engines = None;
        let err = manifest.validate().unwrap_err();
        assert_eq!(
            kind(&err),
            Some(&PublishError::MissingManifestField("engines.vscode"))
        );
    }

    #[test]
    fn test_validate_bad_version_and_names() {
        let mut manifest = Manifest::from_json(SAMPLE).unwrap();
        manifest.version = "one".to_string();
        let err = manifest.validate().unwrap_err();
        assert_eq!(kind(&err), Some(&PublishError::InvalidVersion("one".to_string())));

        let mut manifest = Manifest::from_json(SAMPLE).unwrap();
        manifest.name = "my tool".to_string();
        let err = manifest.validate().unwrap_err();
        assert!(matches!(
            kind(&err),
            Some(PublishError::InvalidName { kind: "extension", .. })
        ));
    }

    #[test]
    fn test_validate_publisher_shapes() {
        assert!(validate_publisher("acme").is_ok());
        assert!(validate_publisher("Acme-Corp2").is_ok());
        assert!(validate_publisher("9lives").is_ok());
        assert!(validate_publisher("").is_err());
        assert!(validate_publisher("-acme").is_err());
        assert!(validate_publisher("acme.tool").is_err());
        assert!(validate_publisher("ac me").is_err());
    }

    #[test]
    fn test_load_and_save_round_trip_preserves_unknown_fields() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), SAMPLE).unwrap();

        let mut manifest = Manifest::load(&runtime, dir.path(), true).unwrap();
        manifest.version = "1.3.0".to_string();
        manifest.save(&runtime, dir.path()).unwrap();

        let written = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(written.ends_with('\n'));
        assert!(!dir.path().join("package.json.tmp").exists());

        let reloaded = Manifest::load(&runtime, dir.path(), true).unwrap();
        assert_eq!(reloaded.version, "1.3.0");
        assert_eq!(reloaded.extra, manifest.extra);
        assert_eq!(reloaded.engines, manifest.engines);
    }

    #[test]
    fn test_save_keeps_key_order_and_nulls() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"publisher":"acme","main":"./out/extension.js","name":"tool","version":"1.2.3","enableProposedApi":null}"#,
        )
        .unwrap();

        let mut manifest = Manifest::load(&runtime, dir.path(), false).unwrap();
        manifest.version = "1.3.0".to_string();
        manifest.save(&runtime, dir.path()).unwrap();

        let written = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let document: Map<String, Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            vec!["publisher", "main", "name", "version", "enableProposedApi"]
        );
        assert_eq!(document["version"], "1.3.0");
        assert!(document["enableProposedApi"].is_null());
    }

    #[test]
    fn test_to_document_appends_new_and_drops_removed_keys() {
        let mut manifest =
            Manifest::from_json(r#"{"name":"tool","main":"a.js","version":"1.0.0","publisher":"acme"}"#)
                .unwrap();
        manifest.extra.remove("main");
        manifest.description = Some("Tools".to_string());

        let document = manifest.to_document().unwrap();
        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            vec!["name", "version", "publisher", "description"]
        );
    }

    #[test]
    fn test_validate_identity_rejects_bad_version() {
        let err = Manifest::new("acme", "tool", "not-a-version")
            .validate_identity()
            .unwrap_err();
        assert_eq!(
            kind(&err),
            Some(&PublishError::InvalidVersion("not-a-version".to_string()))
        );
        assert!(Manifest::new("acme", "tool", "1.0.0").validate_identity().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let err = Manifest::load(&runtime, dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }

    #[test]
    fn test_load_non_strict_skips_validation() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .with(eq(Path::new("/work/package.json")))
            .returning(|_| Ok(r#"{"publisher":"acme","name":"tool"}"#.to_string()));

        let manifest = Manifest::load(&runtime, Path::new("/work"), false).unwrap();
        assert_eq!(manifest.id(), "acme.tool");
        assert!(manifest.version.is_empty());
    }

    #[test]
    fn test_save_writes_temp_then_renames() {
        let mut runtime = MockRuntime::new();
        let mut seq = mockall::Sequence::new();
        runtime
            .expect_write()
            .withf(|path, contents| {
                path == Path::new("/work/package.json.tmp")
                    && String::from_utf8_lossy(contents).contains("\"version\": \"2.0.0\"")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(
                eq(Path::new("/work/package.json.tmp")),
                eq(Path::new("/work/package.json")),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        Manifest::new("acme", "tool", "2.0.0")
            .save(&runtime, Path::new("/work"))
            .unwrap();
    }

    #[test]
    fn test_save_failed_rename_removes_temp() {
        let mut runtime = MockRuntime::new();
        runtime.expect_write().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("permission denied")));
        runtime
            .expect_remove_file()
            .with(eq(Path::new("/work/package.json.tmp")))
            .times(1)
            .returning(|_| Ok(()));

        let err = Manifest::new("acme", "tool", "2.0.0")
            .save(&runtime, Path::new("/work"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to replace manifest"));
    }
}
