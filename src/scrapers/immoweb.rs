//! Immoweb listing extraction.
//!
//! Each listing page embeds its full record as a `window.classified = {...};`
//! assignment inside a script tag. Extraction slices that object out, parses
//! it, applies the hard filters (plain for-sale only, Belgium only), and
//! flattens the nested payload into a [`Listing`].

use crate::models::Listing;
use crate::normalize::numeric_value;
use crate::scrapers::client::build_client;
use crate::scrapers::sitemap::{self, SITEMAP_URL};
use crate::scrapers::traits::ListingSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const CLASSIFIED_MARKER: &str = "window.classified";

fn classified_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)window\.classified\s*=\s*(\{.*?\});").expect("classified pattern is valid")
    })
}

/// Immoweb scraper: sitemap discovery plus per-page extraction, both gated
/// by the shared fetch limiter.
#[derive(Clone)]
pub struct ImmowebScraper {
    client: reqwest::Client,
    limiter: Arc<Semaphore>,
}

impl ImmowebScraper {
    pub fn new(limiter: Arc<Semaphore>) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            limiter,
        })
    }

    /// Mainly for tests: inject a preconfigured client.
    pub fn with_client(client: reqwest::Client, limiter: Arc<Semaphore>) -> Self {
        Self { client, limiter }
    }
}

#[async_trait]
impl ListingSource for ImmowebScraper {
    async fn discover_urls(&self) -> HashSet<String> {
        sitemap::discover_listing_urls(&self.client, self.limiter.clone(), SITEMAP_URL).await
    }

    async fn fetch_listing(&self, url: &str) -> Result<Option<Listing>> {
        let _permit = self
            .limiter
            .clone()
            .acquire_owned()
            .await
            .context("Fetch limiter closed")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch listing page {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("Listing page {url} returned status {}", response.status());
        }
        let html = response
            .text()
            .await
            .context("Failed to read listing page body")?;

        let Some(payload) = classified_payload(&html) else {
            debug!("No classified payload at {url}");
            return Ok(None);
        };
        Ok(extract_listing(&payload, url))
    }

    fn source_name(&self) -> &'static str {
        "Immoweb"
    }
}

/// Locate and parse the embedded classified object.
///
/// A page without the marker script yields `None` ("no data available").
/// A marker with malformed JSON is the one extraction-time failure; it is
/// logged and also yields `None`.
pub fn classified_payload(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;

    for script in document.select(&selector) {
        let text: String = script.text().collect();
        if !text.contains(CLASSIFIED_MARKER) {
            continue;
        }
        let Some(caps) = classified_regex().captures(&text) else {
            continue;
        };
        let raw = caps.get(1)?.as_str();
        return match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Malformed classified payload: {e}");
                None
            }
        };
    }
    None
}

/// Flatten one classified payload into a [`Listing`], or `None` when the
/// hard filters reject it. Pure and total for structured input: missing
/// intermediate objects null out their children instead of failing.
pub fn extract_listing(data: &Value, url: &str) -> Option<Listing> {
    if str_at(data, "/transaction/type").as_deref() != Some("FOR_SALE") {
        debug!("Skipping {url}: not a for-sale transaction");
        return None;
    }
    if str_at(data, "/transaction/subtype").as_deref() == Some("LIFE_ANNUITY") {
        debug!("Skipping {url}: life-annuity sale");
        return None;
    }
    let country = str_at(data, "/property/location/country");
    if !country
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("belgium"))
    {
        debug!("Skipping {url}: country restriction");
        return None;
    }

    let property_id = match data.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            warn!("Listing at {url} has no identifier");
            return None;
        }
    };

    let price = data
        .pointer("/price/mainValue")
        .and_then(numeric_value)
        .filter(|p| p.is_finite())
        .map(|p| p as i64);

    Some(Listing {
        property_id,
        url: url.to_string(),
        locality: str_at(data, "/property/location/locality"),
        postal: str_at(data, "/property/location/postalCode"),
        address: str_at(data, "/property/location/street"),
        region: str_at(data, "/property/location/region"),
        country,
        latitude: f64_at(data, "/property/location/latitude"),
        longitude: f64_at(data, "/property/location/longitude"),
        price,
        sale_type: str_at(data, "/price/type"),
        property_type: str_at(data, "/property/type"),
        number_of_bedrooms: i64_at(data, "/property/bedroomCount"),
        living_area: f64_at(data, "/property/netHabitableSurface"),
        basement: bool_at(data, "/property/hasBasement"),
        open_fire: bool_at(data, "/property/fireplaceExists"),
        terrace: bool_at(data, "/property/hasTerrace"),
        terrace_area: f64_at(data, "/property/terraceSurface"),
        terrace_orientation: str_at(data, "/property/terraceOrientation"),
        garden: bool_at(data, "/property/hasGarden"),
        garden_area: f64_at(data, "/property/gardenSurface"),
        garden_orientation: str_at(data, "/property/gardenOrientation"),
        number_of_facades: i64_at(data, "/property/building/facadeCount"),
        construction_year: i64_at(data, "/property/building/constructionYear"),
        state_of_building: str_at(data, "/property/building/condition"),
        swimming_pool: bool_at(data, "/property/hasSwimmingPool"),
        epc: str_at(data, "/transaction/certificates/epcScore"),
        kwh: f64_at(data, "/transaction/certificates/primaryEnergyConsumptionPerSqm"),
    })
}

fn str_at(data: &Value, pointer: &str) -> Option<String> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn f64_at(data: &Value, pointer: &str) -> Option<f64> {
    data.pointer(pointer).and_then(Value::as_f64)
}

fn i64_at(data: &Value, pointer: &str) -> Option<i64> {
    data.pointer(pointer).and_then(Value::as_i64)
}

fn bool_at(data: &Value, pointer: &str) -> Option<bool> {
    data.pointer(pointer).and_then(Value::as_bool)
}
