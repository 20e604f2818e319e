use anyhow::Result;
use log::debug;
use reqwest::Client;

use std::path::PathBuf;

use crate::{gallery::HttpGalleryConnector, runtime::Runtime, store::FileStore};

/// Everything a command needs, resolved once from the CLI and process state.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub connector: HttpGalleryConnector,
    pub store_path: PathBuf,
    pub cwd: PathBuf,
}

impl<R: Runtime> Config<R> {
    pub fn new(
        runtime: R,
        gallery_url: Option<String>,
        store_path: Option<PathBuf>,
    ) -> Result<Self> {
        let client = Client::builder().user_agent("vsxpub-cli").build()?;
        let connector = HttpGalleryConnector::new(client, gallery_url);

        let store_path = match store_path {
            Some(path) => path,
            None => FileStore::default_path(&runtime)?,
        };
        let cwd = runtime.current_dir()?;
        debug!(
            "Gallery {}, credential store {:?}, cwd {:?}",
            connector.url(),
            store_path,
            cwd
        );

        Ok(Self {
            runtime,
            connector,
            store_path,
            cwd,
        })
    }

    pub fn store(&self) -> FileStore<'_, R> {
        FileStore::new(&self.runtime, self.store_path.clone())
    }

    /// Marketplace page of an extension.
    pub fn item_url(&self, id: &str) -> String {
        format!(
            "{}/items?itemName={}",
            self.connector.url().trim_end_matches('/'),
            id
        )
    }
}
