pub mod client;
pub mod immoweb;
pub mod sitemap;
pub mod traits;

pub use immoweb::ImmowebScraper;
pub use traits::ListingSource;
