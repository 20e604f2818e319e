use anyhow::Result;

use crate::{
    application::{self, UnpublishOptions},
    runtime::Runtime,
};

use super::config::Config;

#[tracing::instrument(skip(config, pat))]
pub async fn unpublish<R: Runtime>(
    config: &Config<R>,
    id: Option<String>,
    pat: Option<String>,
) -> Result<()> {
    let options = UnpublishOptions {
        id,
        cwd: config.cwd.clone(),
        pat,
    };
    let store = config.store();
    let id = application::unpublish(&config.runtime, &store, &config.connector, &options).await?;

    println!("Unpublished {}", id);
    Ok(())
}
