//! URL cache file with explicit freshness metadata.
//!
//! The cache is a tabular file (one header line, one URL per row) plus a
//! `*.meta.json` sibling recording when the set was collected. Freshness is
//! judged from the recorded timestamp rather than file modification time, so
//! copying or touching the files cannot silently extend a cache's life.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

const HEADER: &str = "listing_url";

/// Sidecar metadata written next to the URL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub collected_at: DateTime<Utc>,
    pub url_count: usize,
}

/// A loaded cache: the verbatim URL set and when it was collected.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub urls: HashSet<String>,
    pub collected_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        Utc::now() - self.collected_at < max_age
    }
}

pub struct UrlCache {
    path: PathBuf,
    meta_path: PathBuf,
}

impl UrlCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let meta_path = path.with_extension("meta.json");
        Self { path, meta_path }
    }

    /// Load the cached set, or `None` when no usable cache exists.
    ///
    /// A missing or unreadable file (either of the pair) counts as "no
    /// cache" so the caller falls through to discovery.
    pub async fn load(&self) -> Option<CacheSnapshot> {
        let body = match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(_) => return None,
        };
        let meta_raw = match tokio::fs::read_to_string(&self.meta_path).await {
            Ok(raw) => raw,
            Err(_) => {
                warn!("URL cache has no metadata sidecar, treating as stale");
                return None;
            }
        };
        let meta: CacheMeta = match serde_json::from_str(&meta_raw) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Unreadable cache metadata ({e}), treating as stale");
                return None;
            }
        };

        let urls: HashSet<String> = body
            .lines()
            .skip(1) // header
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Some(CacheSnapshot {
            urls,
            collected_at: meta.collected_at,
        })
    }

    /// Overwrite the cache wholesale with a freshly collected set.
    pub async fn save(&self, urls: &HashSet<String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create cache directory")?;
        }

        let mut body = String::from(HEADER);
        body.push('\n');
        for url in urls {
            body.push_str(url);
            body.push('\n');
        }
        tokio::fs::write(&self.path, body)
            .await
            .context("Failed to write URL cache")?;

        let meta = CacheMeta {
            collected_at: Utc::now(),
            url_count: urls.len(),
        };
        tokio::fs::write(&self.meta_path, serde_json::to_string_pretty(&meta)?)
            .await
            .context("Failed to write URL cache metadata")?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
