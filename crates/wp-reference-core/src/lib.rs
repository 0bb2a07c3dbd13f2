use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

pub mod config;
pub mod error;
pub mod extract;
pub mod search;

pub use config::ReferenceConfig;
pub use error::ReferenceError;
pub use search::{sanitize_search_term, CacheStatus, ReferenceService};

/// Loads configuration and builds a ready service.
///
/// `cache_dir` wins over anything the configuration file or environment set.
pub fn bootstrap(
    config_file: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> Result<ReferenceService> {
    let mut config = ReferenceConfig::load(config_file.as_deref())?;
    if cache_dir.is_some() {
        config.cache_dir = cache_dir;
    }

    let service = ReferenceService::from_config(&config)?;
    info!(
        target: "wp_reference_core",
        base_url = %config.base_url,
        cache_dir = %service.client().cache_dir().display(),
        max_pages = config.max_pages,
        "reference service ready"
    );
    Ok(service)
}
