pub mod cache;
pub mod http;
pub mod links;
pub mod types;

use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use cache::{DiskCache, LastResultsStore};
use directories::ProjectDirs;
use tracing::{debug, instrument};

pub use http::{ClientError, FetchOutcome, PageFetcher};
pub use links::{Filter, LinkBuilder, DEFAULT_BASE_URL};

use crate::types::{CacheEntry, ReferencePage};

/// Seconds a single page request may take before it is abandoned.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Platform cache directory for the reference snapshots.
    pub fn default_cache_dir() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("org", "WordPress", "wp-reference")
            .ok_or_else(|| anyhow!("unable to resolve project directories"))?;
        Ok(project_dirs.cache_dir().join("reference"))
    }

    pub fn with_defaults() -> Result<Self> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: Self::default_cache_dir()?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }
}

/// Network, link and cache plumbing for one documentation host.
#[derive(Debug, Clone)]
pub struct ReferenceClient {
    fetcher: PageFetcher,
    links: LinkBuilder,
    disk_cache: DiskCache,
    last_results: LastResultsStore,
    config: ClientConfig,
}

impl ReferenceClient {
    /// Builds the client and makes sure the cache directory is writable.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.cache_dir).with_context(|| {
            format!(
                "failed to create cache directory '{}'",
                config.cache_dir.display()
            )
        })?;
        let metadata = std::fs::metadata(&config.cache_dir)?;
        if metadata.permissions().readonly() {
            return Err(anyhow!(
                "{} is not writable by current user",
                config.cache_dir.display()
            ));
        }

        let fetcher = PageFetcher::new(config.request_timeout)?;
        let links = LinkBuilder::new(config.base_url.clone());
        let disk_cache = DiskCache::new(&config.cache_dir, links.base_url());
        let last_results = LastResultsStore::new(&config.cache_dir);
        Ok(Self {
            fetcher,
            links,
            disk_cache,
            last_results,
            config,
        })
    }

    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::with_defaults()?)
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.config.cache_dir
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    pub fn disk_cache(&self) -> &DiskCache {
        &self.disk_cache
    }

    pub fn last_results(&self) -> &LastResultsStore {
        &self.last_results
    }

    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        self.fetcher.fetch(url).await
    }

    #[instrument(name = "reference_client.cached_page", skip(self))]
    pub async fn cached_page(&self, url: &str) -> Option<ReferencePage> {
        let entry: CacheEntry<ReferencePage> = self.disk_cache.get(url).await?;
        debug!(target: "wp_reference_cache", url, stored_at = %entry.stored_at, "page served from disk cache");
        Some(entry.value)
    }

    pub async fn store_page(&self, url: &str, page: &ReferencePage) -> Result<()> {
        self.disk_cache.put(url, page.clone()).await
    }
}
