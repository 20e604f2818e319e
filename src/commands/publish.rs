use anyhow::Result;
use std::path::PathBuf;

use crate::{
    application::{self, PublishOptions},
    archive::ZipPackager,
    runtime::Runtime,
};

use super::config::Config;

/// Flags of `vsxpub publish`.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    pub package_path: Option<PathBuf>,
    pub version: Option<String>,
    pub pat: Option<String>,
    pub base_content_url: Option<String>,
    pub base_images_url: Option<String>,
}

#[tracing::instrument(skip(config, request))]
pub async fn publish<R: Runtime>(config: &Config<R>, request: PublishRequest) -> Result<()> {
    let options = PublishOptions {
        cwd: config.cwd.clone(),
        package_path: request.package_path,
        version: request.version,
        base_content_url: request.base_content_url,
        base_images_url: request.base_images_url,
        pat: request.pat,
    };

    let packager = ZipPackager::new(&config.runtime);
    let store = config.store();
    let manifest = application::publish(
        &config.runtime,
        &packager,
        &store,
        &config.connector,
        &options,
    )
    .await?;

    println!("Published {}", manifest.full_id());
    println!(
        "Your extension will live at {} (might take a few minutes for it to show up).",
        config.item_url(&manifest.id())
    );
    Ok(())
}
