//! Standalone data-cleansing pass over the listing store, decoupled from
//! ingestion. Re-normalizes the price and region columns row-by-row.

use anyhow::Result;
use listing_scout::config::ScoutConfig;
use listing_scout::db::ListingStore;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🧹 Listing Scout - store maintenance");

    let config = ScoutConfig::default();
    let store = ListingStore::connect(&config.database_url).await?;
    store.init_schema().await?;

    let total = store.count().await?;
    let prices = store.clean_prices().await?;
    let regions = store.clean_regions().await?;

    info!("Cleaned {prices} price values and {regions} region values across {total} rows");
    Ok(())
}
