use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::types::ReferencePage;

pub const LAST_RESULTS_FILE: &str = "last.json";

/// ID → URL map for the most recently shown listing or document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LastResults(BTreeMap<u32, String>);

impl LastResults {
    /// Row number → link for a listing, `1` → page URL for a document.
    #[must_use]
    pub fn from_page(page: &ReferencePage) -> Self {
        match page {
            ReferencePage::Document(document) => {
                Self(BTreeMap::from([(1, document.page_url.clone())]))
            }
            ReferencePage::Listing(listing) => Self(
                listing
                    .iter()
                    .map(|(index, item)| (index, item.link.clone()))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    /// The only URL when the index describes a single document.
    #[must_use]
    pub fn single(&self) -> Option<&str> {
        if self.0.len() == 1 {
            self.get(1)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(id, url)| (*id, url.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reads and writes the reserved `last.json` file in the cache root.
#[derive(Debug, Clone)]
pub struct LastResultsStore {
    path: PathBuf,
}

impl LastResultsStore {
    pub fn new(cache_root: &Path) -> Self {
        Self {
            path: cache_root.join(LAST_RESULTS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// `None` when there is no index. A corrupt index is deleted and also
    /// reported as `None`.
    pub async fn load(&self) -> Option<LastResults> {
        let bytes = fs::read(&self.path).await.ok()?;
        match serde_json::from_slice::<LastResults>(&bytes) {
            Ok(index) => Some(index),
            Err(error) => {
                warn!(target: "wp_reference_cache", file = ?self.path, error = %error, "discarding corrupt last results index");
                self.remove().await.ok();
                None
            }
        }
    }

    pub async fn save(&self, index: &LastResults) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create cache dir {parent:?}"))?;
        }
        let payload = serde_json::to_vec(index)?;
        fs::write(&self.path, payload)
            .await
            .with_context(|| format!("failed to write {:?}", self.path))?;
        debug!(target: "wp_reference_cache", entries = index.len(), "wrote last results index");
        Ok(())
    }

    pub async fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).with_context(|| format!("failed to remove {:?}", self.path)),
        }
    }
}
