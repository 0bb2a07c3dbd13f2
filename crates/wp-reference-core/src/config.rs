use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;
use wp_reference_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

pub const ENV_PREFIX: &str = "WP_REFERENCE";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Runtime settings for reference lookups.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Documentation host searched and cached.
    pub base_url: String,
    /// Cache root; the platform cache directory when unset.
    pub cache_dir: Option<PathBuf>,
    /// Most listing pages fetched for one search.
    pub max_pages: u32,
    /// Most snapshots kept on disk before the oldest are pruned.
    pub max_cache_entries: usize,
    pub request_timeout_secs: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: None,
            max_pages: 25,
            max_cache_entries: 1000,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ReferenceConfig {
    /// Defaults, then the optional TOML file, then `WP_REFERENCE_*`
    /// environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file(),
        };

        let mut builder = Config::builder();
        if let Some(path) = &file {
            debug!(target: "wp_reference_core", file = %path.display(), "reading configuration file");
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let cache_dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => ClientConfig::default_cache_dir()?,
        };
        Ok(ClientConfig {
            base_url: self.base_url.clone(),
            cache_dir,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "WordPress", "wp-reference")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
