use anyhow::Result;
use log::debug;

use crate::{application::list_extensions, runtime::Runtime};

use super::config::Config;

/// List the extensions a publisher has in the gallery
#[tracing::instrument(skip(config))]
pub async fn list<R: Runtime>(config: &Config<R>, publisher: &str) -> Result<()> {
    let store = config.store();
    let extensions = list_extensions(&store, &config.connector, publisher).await?;

    if extensions.is_empty() {
        println!("No extensions published by {}.", publisher);
        return Ok(());
    }

    debug!("Found {} extension(s)", extensions.len());
    for extension in extensions {
        println!("{}", extension);
    }
    Ok(())
}
