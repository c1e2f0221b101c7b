use std::path::PathBuf;

/// Which URL set the extraction batch runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    /// The full set produced by sitemap discovery (or the fresh cache).
    Discovered,
    /// The built-in smoke-test list; skips nothing else in the pipeline.
    Sample,
}

/// Runtime settings for the scrape and maintenance binaries.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// sqlx connection URL for the listing store.
    pub database_url: String,
    /// Tabular URL cache file; its `*.meta.json` sibling holds the
    /// collected-at timestamp.
    pub url_cache_path: PathBuf,
    /// Cached URL sets older than this are regenerated.
    pub cache_max_age_hours: i64,
    /// Upper bound on simultaneous in-flight fetches.
    pub max_concurrent_fetches: usize,
    pub url_source: UrlSource,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/listings.db".to_string(),
            url_cache_path: PathBuf::from("data/raw/unique_listing_urls.csv"),
            cache_max_age_hours: 24,
            max_concurrent_fetches: 10,
            url_source: UrlSource::Discovered,
        }
    }
}

/// Known-good listing URLs for smoke-testing the extraction path without a
/// full discovery run.
pub const SAMPLE_URLS: &[&str] = &[
    "https://www.immoweb.be/en/classified/villa/for-sale/londerzeel/1840/20311104",
    "https://www.immoweb.be/en/classified/apartment/for-sale/-/1150/20066882",
    "https://www.immoweb.be/en/classified/house/for-sale/st-marcel-de-careiret/30330/20283692",
    "https://www.immoweb.be/en/classified/house/for-sale/longlaville/54810/10725071",
    "https://www.immoweb.be/en/classified/house/for-sale/longueville/1325/20246093",
    "https://www.immoweb.be/en/classified/house/for-sale/schaerbeek/1030/20273974",
    "https://www.immoweb.be/en/classified/apartment/for-sale/gent/9000/20266471",
];
