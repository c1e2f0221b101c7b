use crate::models::Listing;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Common trait for all listing sources
/// This allows easy addition of new portals in the future
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Enumerate candidate listing URLs from the source's sitemap hierarchy.
    /// Partial-failure tolerant: returns whatever discovery succeeded for.
    async fn discover_urls(&self) -> HashSet<String>;

    /// Fetch one listing page and extract its record.
    ///
    /// `Ok(None)` means the page carried no usable payload or the listing was
    /// filtered out; `Err` is a transport failure the caller logs and skips.
    async fn fetch_listing(&self, url: &str) -> Result<Option<Listing>>;

    /// Get the name of the listing source
    fn source_name(&self) -> &'static str;
}
