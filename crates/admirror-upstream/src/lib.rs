//! Ad platform REST API integration for admirror
//!
//! - `client` - AdPlatformClient (HTTP client, cursor pagination)
//! - `fetcher` - HttpFetcher and HttpFetcherFactory implementing the admirror upstream traits
//! - `models` - API models and their conversion into mirror records

pub mod client;
pub mod fetcher;
pub mod models;

pub use client::AdPlatformClient;
pub use fetcher::{HttpFetcher, HttpFetcherFactory};
pub use models::*;
