use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, trace};

use super::{GeoPoint, Geocoder};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

pub struct NominatimGeocoder {
    http: Client,
    search_url: Url,
}

impl NominatimGeocoder {
    pub fn new(http: Client, search_url: &str) -> Result<Self> {
        let search_url = Url::parse(search_url).context("Nominatim URL is not a valid URL")?;
        Ok(Self { http, search_url })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, place: &str) -> Result<Option<GeoPoint>> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", place)
            .append_pair("format", "json")
            .append_pair("limit", "1");

        trace!(%url, "geocoding destination");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to call Nominatim for '{}'", place))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Nominatim returned {} for '{}' (body: {})",
                status,
                place,
                body
            ));
        }

        let body = response
            .text()
            .await
            .context("failed to read Nominatim response")?;
        let point = parse_search_response(&body)?;
        debug!(place, found = point.is_some(), "geocoded destination");
        Ok(point)
    }
}

/// Nominatim returns coordinates as strings; the first hit wins.
pub fn parse_search_response(body: &str) -> Result<Option<GeoPoint>> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).context("failed to parse Nominatim response JSON")?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let lat = hit
        .lat
        .parse::<f64>()
        .with_context(|| format!("invalid latitude '{}'", hit.lat))?;
    let lon = hit
        .lon
        .parse::<f64>()
        .with_context(|| format!("invalid longitude '{}'", hit.lon))?;
    Ok(Some(GeoPoint { lat, lon }))
}
