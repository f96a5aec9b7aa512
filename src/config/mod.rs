//! Configuration for pvcreek

mod logging;
mod source;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use source::SourceConfig;

use crate::filter::FilterSpec;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Top-level configuration, usually read from `pvcreek.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dump source and cache
    #[serde(default)]
    pub source: SourceConfig,
    /// Line filters applied to every stream
    #[serde(default)]
    pub filter: FilterSpec,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        match Url::parse(&self.source.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "base_url must be http or https, got scheme '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("base_url '{}' is not a valid URL: {}", self.source.base_url, e)),
        }

        if self.source.connect_timeout_secs == 0 {
            errors.push("connect_timeout_secs must be positive".to_string());
        }

        if self.source.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        if let Some(dir) = &self.source.cache_dir {
            if dir.as_os_str().is_empty() {
                errors.push("cache_dir must not be empty when set".to_string());
            }
        }

        if let Err(e) = self.filter.build() {
            errors.push(format!("filter: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
