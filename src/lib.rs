pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod scrapers;
