//! SQLite persistence for listing records.

use crate::models::Listing;
use crate::normalize::{normalize_price, normalize_text};
use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::debug;

/// Listing store backed by a single `listings` table.
///
/// Writes are insert-or-replace keyed by `property_id`; each record commits
/// independently.
#[derive(Clone)]
pub struct ListingStore {
    pool: SqlitePool,
}

impl ListingStore {
    /// Open (creating if necessary) the database behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        if database_url != "sqlite::memory:" {
            let db_path = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            if !Path::new(db_path).exists() {
                if let Some(parent) = Path::new(db_path).parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .context("Failed to create database directory")?;
                }
                std::fs::File::create(db_path).context("Failed to create database file")?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to open listing database")?;

        Ok(Self { pool })
    }

    /// Create the `listings` table if it does not exist. Never migrates.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS listings (
                property_id TEXT PRIMARY KEY,
                url TEXT,
                locality TEXT,
                postal TEXT,
                address TEXT,
                region TEXT,
                country TEXT,
                latitude REAL,
                longitude REAL,
                price INTEGER,
                sale_type TEXT,
                property_type TEXT,
                number_of_bedrooms INTEGER,
                living_area REAL,
                basement BOOLEAN,
                open_fire BOOLEAN,
                terrace BOOLEAN,
                terrace_area REAL,
                terrace_orientation TEXT,
                garden BOOLEAN,
                garden_area REAL,
                garden_orientation TEXT,
                number_of_facades INTEGER,
                construction_year INTEGER,
                state_of_building TEXT,
                swimming_pool BOOLEAN,
                epc TEXT,
                kwh REAL,
                last_checked TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or fully replace one listing. `last_checked` repopulates from
    /// its column default on every write.
    pub async fn upsert(&self, listing: &Listing) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR REPLACE INTO listings (
                property_id, url, locality, postal, address, region, country,
                latitude, longitude, price, sale_type, property_type,
                number_of_bedrooms, living_area, basement, open_fire, terrace,
                terrace_area, terrace_orientation, garden, garden_area,
                garden_orientation, number_of_facades, construction_year,
                state_of_building, swimming_pool, epc, kwh
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&listing.property_id)
        .bind(&listing.url)
        .bind(&listing.locality)
        .bind(&listing.postal)
        .bind(&listing.address)
        .bind(&listing.region)
        .bind(&listing.country)
        .bind(listing.latitude)
        .bind(listing.longitude)
        .bind(listing.price)
        .bind(&listing.sale_type)
        .bind(&listing.property_type)
        .bind(listing.number_of_bedrooms)
        .bind(listing.living_area)
        .bind(listing.basement)
        .bind(listing.open_fire)
        .bind(listing.terrace)
        .bind(listing.terrace_area)
        .bind(&listing.terrace_orientation)
        .bind(listing.garden)
        .bind(listing.garden_area)
        .bind(&listing.garden_orientation)
        .bind(listing.number_of_facades)
        .bind(listing.construction_year)
        .bind(&listing.state_of_building)
        .bind(listing.swimming_pool)
        .bind(&listing.epc)
        .bind(listing.kwh)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, property_id: &str) -> Result<Option<Listing>> {
        let row = sqlx::query(
            r"
            SELECT property_id, url, locality, postal, address, region, country,
                   latitude, longitude, price, sale_type, property_type,
                   number_of_bedrooms, living_area, basement, open_fire, terrace,
                   terrace_area, terrace_orientation, garden, garden_area,
                   garden_orientation, number_of_facades, construction_year,
                   state_of_building, swimming_pool, epc, kwh
            FROM listings WHERE property_id = ?
            ",
        )
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(listing_from_row).transpose()
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM listings")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Re-run price coercion over every stored row and write the result back.
    ///
    /// Reads the column as text so rows polluted with non-numeric values
    /// (possible under SQLite's dynamic typing) come out cleanable rather
    /// than failing to decode. Returns the number of rows rewritten.
    pub async fn clean_prices(&self) -> Result<u64> {
        let rows = sqlx::query("SELECT property_id, CAST(price AS TEXT) AS price FROM listings")
            .fetch_all(&self.pool)
            .await?;

        let mut updated = 0u64;
        for row in rows {
            let property_id: String = row.try_get("property_id")?;
            let raw: Option<String> = row.try_get("price")?;
            let cleaned = normalize_price(raw.as_deref());
            sqlx::query("UPDATE listings SET price = ? WHERE property_id = ?")
                .bind(cleaned)
                .bind(&property_id)
                .execute(&self.pool)
                .await?;
            updated += 1;
        }
        debug!("Rewrote price for {updated} rows");
        Ok(updated)
    }

    /// Title-case the region column for every stored row.
    pub async fn clean_regions(&self) -> Result<u64> {
        let rows = sqlx::query("SELECT property_id, region FROM listings")
            .fetch_all(&self.pool)
            .await?;

        let mut updated = 0u64;
        for row in rows {
            let property_id: String = row.try_get("property_id")?;
            let raw: Option<String> = row.try_get("region")?;
            let cleaned = normalize_text(raw.as_deref());
            sqlx::query("UPDATE listings SET region = ? WHERE property_id = ?")
                .bind(cleaned)
                .bind(&property_id)
                .execute(&self.pool)
                .await?;
            updated += 1;
        }
        debug!("Rewrote region for {updated} rows");
        Ok(updated)
    }
}

fn listing_from_row(row: SqliteRow) -> Result<Listing> {
    Ok(Listing {
        property_id: row.try_get("property_id")?,
        url: row.try_get("url")?,
        locality: row.try_get("locality")?,
        postal: row.try_get("postal")?,
        address: row.try_get("address")?,
        region: row.try_get("region")?,
        country: row.try_get("country")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        price: row.try_get("price")?,
        sale_type: row.try_get("sale_type")?,
        property_type: row.try_get("property_type")?,
        number_of_bedrooms: row.try_get("number_of_bedrooms")?,
        living_area: row.try_get("living_area")?,
        basement: row.try_get("basement")?,
        open_fire: row.try_get("open_fire")?,
        terrace: row.try_get("terrace")?,
        terrace_area: row.try_get("terrace_area")?,
        terrace_orientation: row.try_get("terrace_orientation")?,
        garden: row.try_get("garden")?,
        garden_area: row.try_get("garden_area")?,
        garden_orientation: row.try_get("garden_orientation")?,
        number_of_facades: row.try_get("number_of_facades")?,
        construction_year: row.try_get("construction_year")?,
        state_of_building: row.try_get("state_of_building")?,
        swimming_pool: row.try_get("swimming_pool")?,
        epc: row.try_get("epc")?,
        kwh: row.try_get("kwh")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> ListingStore {
        let store = ListingStore::connect("sqlite::memory:").await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn sample_listing(id: &str, price: Option<i64>) -> Listing {
        Listing {
            property_id: id.to_string(),
            url: format!("https://www.immoweb.be/en/classified/house/for-sale/gent/9000/{id}"),
            locality: Some("Gent".to_string()),
            postal: Some("9000".to_string()),
            address: Some("Veldstraat 1".to_string()),
            region: Some("Flanders".to_string()),
            country: Some("Belgium".to_string()),
            latitude: Some(51.05),
            longitude: Some(3.72),
            price,
            sale_type: Some("residential_sale".to_string()),
            property_type: Some("HOUSE".to_string()),
            number_of_bedrooms: Some(3),
            living_area: Some(140.0),
            basement: Some(true),
            open_fire: Some(false),
            terrace: Some(true),
            terrace_area: Some(12.0),
            terrace_orientation: Some("SOUTH".to_string()),
            garden: Some(false),
            garden_area: None,
            garden_orientation: None,
            number_of_facades: Some(2),
            construction_year: Some(1998),
            state_of_building: Some("GOOD".to_string()),
            swimming_pool: Some(false),
            epc: Some("B".to_string()),
            kwh: Some(150.0),
        }
    }

    #[tokio::test]
    async fn upsert_roundtrips_all_fields() {
        let store = memory_store().await;
        let listing = sample_listing("100", Some(250000));
        store.upsert(&listing).await.unwrap();

        let stored = store.fetch("100").await.unwrap().unwrap();
        assert_eq!(stored, listing);
    }

    #[tokio::test]
    async fn upsert_twice_keeps_one_row_with_latest_values() {
        let store = memory_store().await;
        store
            .upsert(&sample_listing("100", Some(250000)))
            .await
            .unwrap();
        store
            .upsert(&sample_listing("100", Some(240000)))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.fetch("100").await.unwrap().unwrap();
        assert_eq!(stored.price, Some(240000));
    }

    #[tokio::test]
    async fn replace_resets_absent_fields_to_null() {
        let store = memory_store().await;
        store
            .upsert(&sample_listing("100", Some(250000)))
            .await
            .unwrap();

        let mut sparse = sample_listing("100", None);
        sparse.epc = None;
        sparse.kwh = None;
        store.upsert(&sparse).await.unwrap();

        let stored = store.fetch("100").await.unwrap().unwrap();
        assert_eq!(stored.price, None);
        assert_eq!(stored.epc, None);
        assert_eq!(stored.kwh, None);
    }

    #[tokio::test]
    async fn clean_prices_nulls_junk_and_keeps_numbers() {
        let store = memory_store().await;
        store
            .upsert(&sample_listing("100", Some(250000)))
            .await
            .unwrap();
        store.upsert(&sample_listing("200", None)).await.unwrap();
        // SQLite's dynamic typing lets junk text land in the INTEGER column.
        sqlx::query("UPDATE listings SET price = 'on request' WHERE property_id = '200'")
            .execute(&store.pool)
            .await
            .unwrap();

        let updated = store.clean_prices().await.unwrap();
        assert_eq!(updated, 2);

        let kept = store.fetch("100").await.unwrap().unwrap();
        assert_eq!(kept.price, Some(250000));
        let cleaned = store.fetch("200").await.unwrap().unwrap();
        assert_eq!(cleaned.price, None);
    }

    #[tokio::test]
    async fn clean_regions_title_cases() {
        let store = memory_store().await;
        let mut listing = sample_listing("100", Some(250000));
        listing.region = Some("walloon brabant".to_string());
        store.upsert(&listing).await.unwrap();

        store.clean_regions().await.unwrap();

        let stored = store.fetch("100").await.unwrap().unwrap();
        assert_eq!(stored.region, Some("Walloon Brabant".to_string()));
    }
}
