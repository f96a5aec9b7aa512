use anyhow::Result;
use pvcreek::{
    config::Config,
    source::{filename_from_timestamp, parse_timestamp, url_from_filename},
};

pub fn show_filename(config: Config, timestamp: String, base_url: Option<String>) -> Result<()> {
    let Some(ts) = parse_timestamp(&timestamp) else {
        anyhow::bail!(
            "Could not parse timestamp '{}'. Use e.g. 2024-01-05T07 or 2024-01-05T07:30:00Z",
            timestamp
        );
    };

    let filename = filename_from_timestamp(&ts);
    let url = url_from_filename(&base_url.unwrap_or(config.source.base_url), &filename)?;
    println!("{}", filename);
    println!("{}", url);
    Ok(())
}
