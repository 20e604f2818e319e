use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::{
    archive::{PackOptions, Packager, ZipPackager},
    package::Manifest,
    runtime::Runtime,
};

use super::config::Config;

/// `<name>-<version>.vsix` in the working directory.
fn default_output(manifest: &Manifest, cwd: &std::path::Path) -> PathBuf {
    cwd.join(format!("{}-{}.vsix", manifest.name, manifest.version))
}

/// Build a `.vsix` from the working directory without publishing it.
#[tracing::instrument(skip(config))]
pub async fn package<R: Runtime>(
    config: &Config<R>,
    out: Option<PathBuf>,
    base_content_url: Option<String>,
    base_images_url: Option<String>,
) -> Result<()> {
    let package_path = match out {
        Some(path) if path.is_absolute() => path,
        Some(path) => config.cwd.join(path),
        None => {
            let manifest = Manifest::load(&config.runtime, &config.cwd, false)?;
            default_output(&manifest, &config.cwd)
        }
    };
    debug!("Packaging into {:?}", package_path);
    if let Some(parent) = package_path.parent() {
        if !config.runtime.exists(parent) {
            config.runtime.create_dir_all(parent)?;
        }
    }

    let result = ZipPackager::new(&config.runtime)
        .pack(PackOptions {
            package_path,
            cwd: config.cwd.clone(),
            base_content_url,
            base_images_url,
        })
        .await?;

    println!(
        "Packaged: {} ({})",
        result.package_path.display(),
        result.manifest.full_id()
    );
    Ok(())
}
