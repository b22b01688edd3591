//! Thin lookups against public map and encyclopedia services.

pub mod nominatim;
pub mod overpass;
pub mod summary;
pub mod wikipedia;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::itinerary::models::Poi;

pub use nominatim::NominatimGeocoder;
pub use overpass::{InterestTag, OverpassClient};
pub use summary::{SummaryChain, SummaryStrategy};
pub use wikipedia::{WikipediaGeosearch, WikipediaSummary};

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(20);
pub const OVERPASS_TIMEOUT: Duration = Duration::from_secs(40);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, place: &str) -> Result<Option<GeoPoint>>;
}

#[async_trait]
pub trait SightSearch: Send + Sync {
    async fn nearby(&self, center: GeoPoint, radius_m: u32, limit: u32) -> Result<Vec<Poi>>;
}

#[async_trait]
pub trait TagSearch: Send + Sync {
    async fn search(&self, center: GeoPoint, interest: &str, radius_m: u32) -> Result<Vec<Poi>>;
}

/// Short description for a place. Never fails: it ends in a generic default.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str) -> String;
}

/// OSM and Wikipedia both ask for a contactable User-Agent.
pub fn user_agent(email: &str) -> String {
    format!("voyagecraft/1.0 ({})", email)
}

pub fn lookup_client(email: &str, timeout: Duration) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    Client::builder()
        .user_agent(user_agent(email))
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .context("failed to build lookup reqwest client")
}
