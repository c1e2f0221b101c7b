use anyhow::Result;
use chrono::Duration;
use listing_scout::cache::UrlCache;
use listing_scout::config::{ScoutConfig, UrlSource, SAMPLE_URLS};
use listing_scout::db::ListingStore;
use listing_scout::scrapers::{ImmowebScraper, ListingSource};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🏠 Listing Scout - Immoweb pipeline");

    let config = ScoutConfig::default();
    let store = ListingStore::connect(&config.database_url).await?;
    store.init_schema().await?;

    let limiter = Arc::new(Semaphore::new(config.max_concurrent_fetches));
    let scraper = ImmowebScraper::new(limiter.clone())?;
    let cache = UrlCache::new(config.url_cache_path.clone());
    let max_age = Duration::hours(config.cache_max_age_hours);

    let urls = match cache.load().await {
        Some(snapshot) if snapshot.is_fresh(max_age) => {
            info!(
                "Reusing {} cached listing URLs (collected {})",
                snapshot.urls.len(),
                snapshot.collected_at
            );
            snapshot.urls
        }
        existing => {
            if existing.is_some() {
                info!(
                    "URL cache is older than {} hours, rediscovering",
                    config.cache_max_age_hours
                );
            } else {
                info!("No usable URL cache, running discovery");
            }
            let discovered = scraper.discover_urls().await;
            info!(
                "Discovered {} unique for-sale listing URLs",
                discovered.len()
            );
            cache.save(&discovered).await?;
            discovered
        }
    };

    let batch: Vec<String> = match config.url_source {
        UrlSource::Discovered => urls.into_iter().collect(),
        UrlSource::Sample => SAMPLE_URLS.iter().map(|url| url.to_string()).collect(),
    };
    info!(
        "Extracting {} listing pages from {}",
        batch.len(),
        scraper.source_name()
    );

    let mut tasks = JoinSet::new();
    for url in batch {
        let scraper = scraper.clone();
        tasks.spawn(async move {
            let result = scraper.fetch_listing(&url).await;
            (url, result)
        });
    }

    let mut stored = 0usize;
    let mut skipped = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let Ok((url, result)) = joined else {
            warn!("Extraction task failed to run");
            skipped += 1;
            continue;
        };
        match result {
            Ok(Some(listing)) => match store.upsert(&listing).await {
                Ok(()) => stored += 1,
                Err(e) => {
                    warn!("Failed to store listing from {url}: {e}");
                    skipped += 1;
                }
            },
            Ok(None) => skipped += 1,
            Err(e) => {
                warn!("Failed to extract {url}: {e}");
                skipped += 1;
            }
        }
    }

    info!("✅ Stored {stored} listings ({skipped} skipped)");
    Ok(())
}
