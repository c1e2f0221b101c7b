//! Two-phase listing URL discovery over the portal's sitemap hierarchy.
//!
//! Phase 1 fetches the top-level sitemap index and keeps the classifieds
//! category files. Phase 2 fans out over those files, bounded by the shared
//! fetch limiter, and collects every English for-sale listing URL. Each task
//! returns its own findings; the sets are merged at the join point so no
//! collection is mutated concurrently.

use anyhow::Result;
use quick_xml::events::Event;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const SITEMAP_URL: &str = "https://www.immoweb.be/sitemap.xml";
pub const LISTING_URL_PREFIX: &str = "https://www.immoweb.be/en/classified";

/// Phase 1: category sitemap files listed in the index.
///
/// A fetch failure is logged and yields an empty list; discovery then simply
/// finds nothing.
pub async fn fetch_sitemap_index(client: &Client, sitemap_url: &str) -> Vec<String> {
    match fetch_text(client, sitemap_url).await {
        Ok(xml) => sitemap_locations(&xml)
            .into_iter()
            .filter(|url| is_classifieds_index(url))
            .collect(),
        Err(e) => {
            warn!("Failed to fetch the sitemap index: {e}");
            Vec::new()
        }
    }
}

/// Phase 2: the full unique set of for-sale listing URLs.
///
/// One task per category file, each gated by the shared limiter. Category
/// files that fail to fetch are logged and contribute nothing.
pub async fn discover_listing_urls(
    client: &Client,
    limiter: Arc<Semaphore>,
    sitemap_url: &str,
) -> HashSet<String> {
    let category_urls = fetch_sitemap_index(client, sitemap_url).await;
    debug!(
        "Sitemap index yielded {} classifieds files",
        category_urls.len()
    );

    let mut tasks = JoinSet::new();
    for category_url in category_urls {
        let client = client.clone();
        let limiter = limiter.clone();
        tasks.spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Vec::new(), // limiter closed, shutting down
            };
            match fetch_text(&client, &category_url).await {
                Ok(xml) => sitemap_locations(&xml)
                    .into_iter()
                    .filter(|url| is_listing_url(url))
                    .collect(),
                Err(e) => {
                    warn!("Failed to fetch classifieds file {category_url}: {e}");
                    Vec::new()
                }
            }
        });
    }

    let mut unique_urls = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(urls) => unique_urls.extend(urls),
            Err(e) => warn!("Discovery task failed: {e}"),
        }
    }
    unique_urls
}

async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("{url} returned status {}", response.status());
    }
    Ok(response.text().await?)
}

/// Extract every `<loc>` value from a sitemap document.
pub fn sitemap_locations(xml: &str) -> Vec<String> {
    let mut locations = Vec::new();
    let mut in_loc = false;

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                in_loc = e.name().as_ref() == b"loc";
            }
            Ok(Event::Text(ref e)) => {
                if in_loc {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    if !text.is_empty() {
                        locations.push(text);
                    }
                }
            }
            Ok(Event::End(_)) => in_loc = false,
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Sitemap document is malformed ({e}), keeping what was read");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    locations
}

fn is_classifieds_index(url: &str) -> bool {
    url.contains("classifieds")
}

/// English for-sale classified URLs only, anchored to the canonical prefix
/// so isolated listing identifiers never slip through.
fn is_listing_url(url: &str) -> bool {
    url.contains("en/classified") && url.contains("for-sale") && url.starts_with(LISTING_URL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::client::build_client;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn locations_come_from_loc_tags_only() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sitemap><loc>https://www.immoweb.be/sitemap-classifieds-1.xml</loc></sitemap>
              <sitemap>
                <loc> https://www.immoweb.be/sitemap-agencies.xml </loc>
                <lastmod>2024-01-01</lastmod>
              </sitemap>
            </sitemapindex>"#;
        assert_eq!(
            sitemap_locations(xml),
            vec![
                "https://www.immoweb.be/sitemap-classifieds-1.xml".to_string(),
                "https://www.immoweb.be/sitemap-agencies.xml".to_string(),
            ]
        );
    }

    #[test]
    fn truncated_document_keeps_locations_read_so_far() {
        let xml = r#"<sitemapindex>
              <sitemap><loc>https://www.immoweb.be/sitemap-classifieds-1.xml</loc></sitemap>
              <sitemap><loc"#;
        assert_eq!(
            sitemap_locations(xml),
            vec!["https://www.immoweb.be/sitemap-classifieds-1.xml".to_string()]
        );
    }

    #[test]
    fn listing_url_filter() {
        assert!(is_listing_url(
            "https://www.immoweb.be/en/classified/house/for-sale/gent/9000/20266471"
        ));
        // wrong language
        assert!(!is_listing_url(
            "https://www.immoweb.be/fr/annonce/maison/a-vendre/gand/9000/20266471"
        ));
        // rentals are out
        assert!(!is_listing_url(
            "https://www.immoweb.be/en/classified/house/for-rent/gent/9000/20266471"
        ));
        // bare identifier without the canonical prefix
        assert!(!is_listing_url("en/classified/for-sale/20266471"));
    }

    #[tokio::test]
    async fn discovery_merges_tasks_and_tolerates_missing_files() {
        let server = MockServer::start().await;
        let base = server.uri();

        let index = format!(
            "<sitemapindex>\
               <sitemap><loc>{base}/sitemap-classifieds-1.xml</loc></sitemap>\
               <sitemap><loc>{base}/sitemap-classifieds-2.xml</loc></sitemap>\
               <sitemap><loc>{base}/sitemap-agencies.xml</loc></sitemap>\
             </sitemapindex>"
        );
        let category = "<urlset>\
            <url><loc>https://www.immoweb.be/en/classified/house/for-sale/gent/9000/1</loc></url>\
            <url><loc>https://www.immoweb.be/en/classified/house/for-rent/gent/9000/2</loc></url>\
            <url><loc>https://www.immoweb.be/en/classified/villa/for-sale/aalst/9300/3</loc></url>\
            </urlset>";

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(index))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sitemap-classifieds-1.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(category))
            .mount(&server)
            .await;
        // /sitemap-classifieds-2.xml stays unmocked: a 404 must only be skipped

        let client = build_client().unwrap();
        let limiter = Arc::new(Semaphore::new(10));
        let urls =
            discover_listing_urls(&client, limiter, &format!("{base}/sitemap.xml")).await;

        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://www.immoweb.be/en/classified/house/for-sale/gent/9000/1"));
        assert!(urls.contains("https://www.immoweb.be/en/classified/villa/for-sale/aalst/9300/3"));
    }

    #[tokio::test]
    async fn index_fetch_failure_yields_empty_discovery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let limiter = Arc::new(Semaphore::new(10));
        let urls = discover_listing_urls(
            &client,
            limiter,
            &format!("{}/sitemap.xml", server.uri()),
        )
        .await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn limiter_caps_simultaneous_tasks() {
        let limiter = Arc::new(Semaphore::new(3));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = JoinSet::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while tasks.join_next().await.is_some() {}

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
