use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use wp_reference_client::{
    cache::LastResults,
    types::{Listing, ReferencePage},
    FetchOutcome, Filter, ReferenceClient,
};

use crate::{
    config::ReferenceConfig,
    error::{ReferenceError, Result},
    extract::{parse_document, scan_listing, ListingScan},
};

/// Returns `term` unchanged when it holds at least one ASCII letter or digit.
pub fn sanitize_search_term(term: &str) -> Result<&str> {
    if term.chars().any(|c| c.is_ascii_alphanumeric()) {
        Ok(term)
    } else {
        Err(ReferenceError::EmptyKeyword)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub entries: usize,
    pub max_entries: usize,
    pub has_last_results: bool,
}

/// Drives searches and drill-downs through cache, network and extraction.
#[derive(Debug, Clone)]
pub struct ReferenceService {
    client: ReferenceClient,
    max_pages: u32,
    max_cache_entries: usize,
}

impl ReferenceService {
    pub fn new(client: ReferenceClient, max_pages: u32, max_cache_entries: usize) -> Self {
        Self {
            client,
            max_pages,
            max_cache_entries,
        }
    }

    pub fn from_config(config: &ReferenceConfig) -> anyhow::Result<Self> {
        let client = ReferenceClient::with_config(config.client_config()?)?;
        Ok(Self::new(client, config.max_pages, config.max_cache_entries))
    }

    pub fn client(&self) -> &ReferenceClient {
        &self.client
    }

    /// Searches for `term`; an empty `filters` slice uses the default set.
    ///
    /// A search that the site redirects to a single entry yields a document.
    #[instrument(name = "reference_service.search", skip(self))]
    pub async fn search(&self, term: &str, filters: &[Filter]) -> Result<ReferencePage> {
        let term = sanitize_search_term(term)?;
        self.client.last_results().remove().await?;

        let url = self.client.links().search_url(term, filters, 1);
        let page = if let Some(page) = self.client.cached_page(&url).await {
            page
        } else {
            let page = self.fetch_search(term, filters, &url).await?;
            self.remember(&url, &page).await;
            page
        };

        self.finish(page).await
    }

    /// Opens entry `id` of the last shown results. An unknown `id` is
    /// `Ok(None)`.
    #[instrument(name = "reference_service.select_by_id", skip(self))]
    pub async fn select_by_id(&self, id: u32) -> Result<Option<ReferencePage>> {
        let index = self
            .client
            .last_results()
            .load()
            .await
            .ok_or(ReferenceError::EmptyHistory)?;

        let Some(url) = index.get(id).map(str::to_string) else {
            debug!(target: "wp_reference_core", id, "id not present in last results");
            return Ok(None);
        };
        self.open_document(&url).await.map(Some)
    }

    /// Fetches (or reads from cache) the reference document at `url`.
    #[instrument(name = "reference_service.open_document", skip(self))]
    pub async fn open_document(&self, url: &str) -> Result<ReferencePage> {
        let page = if let Some(page) = self.client.cached_page(url).await {
            page
        } else {
            let (page_url, body) = match self.client.fetch(url).await {
                FetchOutcome::Error(error) => return Err(ReferenceError::Connectivity(error)),
                FetchOutcome::Redirect { url: target, body } => (target, body),
                FetchOutcome::Data { body } => (url.to_string(), body),
            };
            let document =
                parse_document(&body, &page_url).ok_or(ReferenceError::MalformedPage)?;
            let page = ReferencePage::from(document);
            self.remember(url, &page).await;
            page
        };

        self.finish(page).await
    }

    /// URL to show in a browser: the single document just displayed (which
    /// consumes the last results), otherwise the reference home page.
    pub async fn browser_target(&self) -> Result<String> {
        let store = self.client.last_results();
        if let Some(url) = store
            .load()
            .await
            .and_then(|index| index.single().map(str::to_string))
        {
            store.remove().await?;
            return Ok(url);
        }
        Ok(self.client.links().home_page())
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.client.disk_cache().clear().await?;
        info!(target: "wp_reference_core", root = %self.client.cache_dir().display(), "cache cleared");
        Ok(())
    }

    pub async fn cache_status(&self) -> Result<CacheStatus> {
        let root = self.client.cache_dir().clone();
        Ok(CacheStatus {
            exists: root.exists(),
            entries: self.client.disk_cache().len().await?,
            max_entries: self.max_cache_entries,
            has_last_results: self.client.last_results().exists().await,
            path: root,
        })
    }

    async fn fetch_search(&self, term: &str, filters: &[Filter], url: &str) -> Result<ReferencePage> {
        let body = match self.client.fetch(url).await {
            FetchOutcome::Error(error) => return Err(ReferenceError::Connectivity(error)),
            FetchOutcome::Redirect { url: target, body } => {
                debug!(target: "wp_reference_core", %target, "search resolved to a single entry");
                return parse_document(&body, &target)
                    .map(ReferencePage::from)
                    .ok_or(ReferenceError::MalformedPage);
            }
            FetchOutcome::Data { body } => body,
        };

        let first = match scan_listing(&body) {
            ListingScan::NotFound => return Err(ReferenceError::NotFound),
            ListingScan::Page(page) => page,
        };

        let mut listing = Listing::new();
        let paginated = first.is_paginated();
        let mut is_last_page = first.is_last_page;
        listing.extend(first.items);

        if paginated {
            for paged in 2..=self.max_pages {
                if is_last_page {
                    break;
                }
                let page_url = self.client.links().search_url(term, filters, paged);
                let body = match self.client.fetch(&page_url).await {
                    FetchOutcome::Data { body } => body,
                    _ => {
                        warn!(target: "wp_reference_core", paged, "skipping unavailable results page");
                        continue;
                    }
                };
                match scan_listing(&body) {
                    ListingScan::NotFound => break,
                    ListingScan::Page(page) => {
                        is_last_page = page.is_last_page;
                        listing.extend(page.items);
                    }
                }
            }
        }

        debug!(target: "wp_reference_core", results = listing.len(), "search listing assembled");
        if listing.is_empty() {
            return Err(ReferenceError::MalformedPage);
        }
        Ok(ReferencePage::Listing(listing))
    }

    /// Snapshots `page` under `url`. Write failures are logged and the page
    /// is still returned.
    async fn remember(&self, url: &str, page: &ReferencePage) {
        if let Err(error) = self.client.store_page(url, page).await {
            warn!(target: "wp_reference_cache", url, error = %format!("{error:#}"), "failed to cache reference page");
        }
    }

    async fn finish(&self, page: ReferencePage) -> Result<ReferencePage> {
        if page.is_empty() {
            return Err(ReferenceError::MalformedPage);
        }
        self.client
            .last_results()
            .save(&LastResults::from_page(&page))
            .await?;
        let evicted = self
            .client
            .disk_cache()
            .prune(self.max_cache_entries)
            .await?;
        if evicted > 0 {
            debug!(target: "wp_reference_core", evicted, "pruned reference cache");
        }
        Ok(page)
    }
}
