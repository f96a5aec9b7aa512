//! Dump source configuration

use crate::source::{HttpSettings, BASE_URL, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where dumps come from and where they are cached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of the pageviews tree on the dumps server
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Directory holding downloaded dumps (None = always stream from the server)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connection timeout (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl SourceConfig {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_dir: None,
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}
