use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{de::DeserializeOwned, Serialize};
use time::OffsetDateTime;
use tokio::{fs, task};
use tracing::{debug, warn};

use super::last::LAST_RESULTS_FILE;
use crate::types::CacheEntry;

/// Namespace token that replaces the documentation host in file names.
const HOST_TOKEN: &str = "reference";

/// URL-keyed JSON snapshots, bounded by entry count.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    host: Option<String>,
}

impl DiskCache {
    /// `base_url` names the host whose authority is folded into [`HOST_TOKEN`].
    pub fn new<P: Into<PathBuf>>(root: P, base_url: &str) -> Self {
        let host = Url::parse(base_url).ok().and_then(|url| {
            url.host_str().map(|host| match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
        });
        Self {
            root: root.into(),
            host,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic file name for `url`: trailing slash trimmed, host
    /// replaced by the namespace token, scheme dropped, `/` → `---`,
    /// `?` → `+++`.
    ///
    /// URLs that already contain `---` or `+++` can collide with ones that
    /// produce them.
    #[must_use]
    pub fn file_name_for(&self, url: &str) -> String {
        let mut link = url.trim_end_matches('/').to_string();
        if let Some(host) = &self.host {
            link = replace_ignore_ascii_case(&link, host, HOST_TOKEN);
        }
        for scheme in ["https://", "http://"] {
            if link
                .get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
            {
                link = link[scheme.len()..].to_string();
            }
        }
        let link = link.replace('/', "---").replace('?', "+++");
        format!("{link}.json")
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(self.file_name_for(url))
    }

    /// Reads the snapshot for `url`. Missing and undecodable files are both
    /// a miss.
    pub async fn get<T>(&self, url: &str) -> Option<CacheEntry<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.path_for(url);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(error) => {
                warn!(target: "wp_reference_cache", file = ?path, error = %error, "unreadable cache file");
                return None;
            }
        };

        let decoded = task::spawn_blocking(move || {
            serde_json::from_slice::<CacheEntry<T>>(&data).or_else(|_| {
                serde_json::from_slice::<T>(&data).map(|value| CacheEntry {
                    value,
                    stored_at: OffsetDateTime::UNIX_EPOCH,
                })
            })
        })
        .await;

        match decoded {
            Ok(Ok(entry)) => {
                debug!(target: "wp_reference_cache", file = ?path, "cache hit");
                Some(entry)
            }
            Ok(Err(error)) => {
                warn!(target: "wp_reference_cache", file = ?path, error = %error, "malformed cache file treated as miss");
                None
            }
            Err(error) => {
                warn!(target: "wp_reference_cache", error = %error, "cache decode task failed");
                None
            }
        }
    }

    pub async fn put<T>(&self, url: &str, value: T) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        let path = self.path_for(url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create cache dir {parent:?}"))?;
        }

        let entry = CacheEntry {
            value,
            stored_at: OffsetDateTime::now_utc(),
        };
        let payload = task::spawn_blocking(move || serde_json::to_vec(&entry)).await??;

        // Write beside the target and rename so readers never see a partial file.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, payload)
            .await
            .with_context(|| format!("failed to write cache file {staging:?}"))?;
        fs::rename(&staging, &path)
            .await
            .with_context(|| format!("failed to move cache file into place {path:?}"))?;

        debug!(target: "wp_reference_cache", file = ?path, "wrote cache entry");
        Ok(())
    }

    /// Deletes the oldest snapshots (by modification time) until at most
    /// `max_entries` remain. The last-results file is never counted or removed.
    pub async fn prune(&self, max_entries: usize) -> Result<usize> {
        let mut entries = self.list_entries().await?;
        if entries.len() <= max_entries {
            return Ok(0);
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        let overflow = entries.len() - max_entries;
        let mut evicted = 0;
        for (_, path) in entries.into_iter().take(overflow) {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    evicted += 1;
                    debug!(target: "wp_reference_cache", file = ?path, "evicted cache entry");
                }
                Err(error) => {
                    warn!(target: "wp_reference_cache", file = ?path, error = %error, "failed to evict cache entry");
                }
            }
        }
        Ok(evicted)
    }

    /// Number of snapshots on disk, excluding the last-results file.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.list_entries().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Removes the whole cache directory.
    pub async fn clear(&self) -> Result<()> {
        if fs::try_exists(&self.root).await.unwrap_or(false) {
            fs::remove_dir_all(&self.root)
                .await
                .with_context(|| format!("failed to remove cache dir {:?}", self.root))?;
        }
        debug!(target: "wp_reference_cache", root = ?self.root, "cache cleared");
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<(SystemTime, PathBuf)>> {
        let mut entries = Vec::new();
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(entries);
        }

        let mut read_dir = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("failed to list cache dir {:?}", self.root))?;
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_name() == LAST_RESULTS_FILE {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, entry.path()));
        }
        Ok(entries)
    }
}

/// Host names compare case-insensitively; ASCII folding keeps byte offsets
/// aligned between `haystack` and its lowered copy.
fn replace_ignore_ascii_case(haystack: &str, needle: &str, with: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let lowered = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lowered.match_indices(needle.as_str()) {
        out.push_str(&haystack[last..start]);
        out.push_str(with);
        last = start + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}
