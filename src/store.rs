//! Publisher credential storage.
//!
//! Credentials live in a small JSON file (`~/.vsce` by default):
//! `{"publishers":[{"name":"acme","pat":"..."}]}`.

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PublishError;
use crate::runtime::Runtime;

/// File name of the store inside the home directory.
pub const STORE_FILE: &str = ".vsce";

/// The store holds tokens: owner read/write only.
const STORE_MODE: u32 = 0o600;

#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct Publisher {
    pub name: String,
    pub pat: String,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("name", &self.name)
            .field("pat", &mask(&self.pat))
            .finish()
    }
}

fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}****{}", head, tail)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
struct StoreFile {
    #[serde(default)]
    publishers: Vec<Publisher>,
}

#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Look up a publisher; unknown names fail with [`PublishError::UnknownPublisher`].
    fn get_publisher(&self, name: &str) -> Result<Publisher>;
    fn publishers(&self) -> Result<Vec<Publisher>>;
    /// Insert or replace a publisher by name.
    fn add_publisher(&self, publisher: Publisher) -> Result<()>;
    fn remove_publisher(&self, name: &str) -> Result<()>;
}

/// JSON-file backed credential store.
pub struct FileStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> FileStore<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    /// `~/.vsce`
    pub fn default_path(runtime: &R) -> Result<PathBuf> {
        runtime
            .home_dir()
            .map(|home| home.join(STORE_FILE))
            .ok_or_else(|| anyhow!("Could not determine home directory"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreFile> {
        if !self.runtime.exists(&self.path) {
            debug!("No credential store at {:?}", self.path);
            return Ok(StoreFile::default());
        }
        let content = self.runtime.read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(StoreFile::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credential store {:?}", self.path))
    }

    fn save(&self, store: &StoreFile) -> Result<()> {
        let content = serde_json::to_string_pretty(store)?;
        self.runtime
            .write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write credential store {:?}", self.path))?;
        self.runtime.set_permissions(&self.path, STORE_MODE)
    }
}

impl<'a, R: Runtime> CredentialStore for FileStore<'a, R> {
    #[tracing::instrument(skip(self))]
    fn get_publisher(&self, name: &str) -> Result<Publisher> {
        self.load()?
            .publishers
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PublishError::UnknownPublisher(name.to_string()).into())
    }

    fn publishers(&self) -> Result<Vec<Publisher>> {
        Ok(self.load()?.publishers)
    }

    #[tracing::instrument(skip(self))]
    fn add_publisher(&self, publisher: Publisher) -> Result<()> {
        let mut store = self.load()?;
        store.publishers.retain(|p| p.name != publisher.name);
        store.publishers.push(publisher);
        self.save(&store)
    }

    #[tracing::instrument(skip(self))]
    fn remove_publisher(&self, name: &str) -> Result<()> {
        let mut store = self.load()?;
        let before = store.publishers.len();
        store.publishers.retain(|p| p.name != name);
        if store.publishers.len() == before {
            return Err(PublishError::UnknownPublisher(name.to_string()).into());
        }
        self.save(&store)
    }
}
