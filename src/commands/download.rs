use anyhow::{Context, Result};
use pvcreek::{config::Config, ByteSource, ReqwestClient};
use std::path::PathBuf;
use std::sync::Arc;

pub fn download_dump(
    config: Config,
    file: String,
    cache_dir: Option<PathBuf>,
    base_url: Option<String>,
) -> Result<()> {
    let Some(cache_dir) = cache_dir.or(config.source.cache_dir.clone()) else {
        anyhow::bail!("No cache directory given. Pass --cache-dir or set source.cache_dir");
    };

    let id = super::file_id(&file);
    let client = ReqwestClient::new(&config.source.http_settings())?;
    let source = ByteSource::new(
        base_url.unwrap_or(config.source.base_url.clone()),
        Arc::new(client),
    );

    let path = source
        .download(&id, &cache_dir)
        .with_context(|| format!("Failed to download {}", id))?;
    println!("{}", path.display());
    Ok(())
}
