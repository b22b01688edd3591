use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace};
use urlencoding::encode;

use super::summary::SummaryStrategy;
use super::{GeoPoint, SightSearch};
use crate::itinerary::models::{Poi, SIGHT};

pub const DEFAULT_GEOSEARCH_URL: &str = "https://en.wikipedia.org/w/api.php";

#[derive(Debug, Default, Deserialize)]
struct GeosearchResponse {
    #[serde(default)]
    query: GeosearchQuery,
}

#[derive(Debug, Default, Deserialize)]
struct GeosearchQuery {
    #[serde(default)]
    geosearch: Vec<GeosearchHit>,
}

#[derive(Debug, Deserialize)]
struct GeosearchHit {
    title: String,
    lat: f64,
    lon: f64,
}

pub struct WikipediaGeosearch {
    http: Client,
    api_url: Url,
}

impl WikipediaGeosearch {
    pub fn new(http: Client, api_url: &str) -> Result<Self> {
        let api_url = Url::parse(api_url).context("Wikipedia API URL is not a valid URL")?;
        Ok(Self { http, api_url })
    }
}

#[async_trait]
impl SightSearch for WikipediaGeosearch {
    async fn nearby(&self, center: GeoPoint, radius_m: u32, limit: u32) -> Result<Vec<Poi>> {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "geosearch")
            .append_pair("gscoord", &format!("{}|{}", center.lat, center.lon))
            .append_pair("gsradius", &radius_m.to_string())
            .append_pair("gslimit", &limit.to_string())
            .append_pair("format", "json");

        trace!(%url, "searching nearby sights");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to call Wikipedia geosearch")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Wikipedia geosearch returned {} (body: {})",
                status,
                body
            ));
        }

        let body = response
            .text()
            .await
            .context("failed to read Wikipedia geosearch response")?;
        let sights = parse_geosearch(&body)?;
        debug!(count = sights.len(), "fetched nearby sights");
        Ok(sights)
    }
}

pub fn parse_geosearch(body: &str) -> Result<Vec<Poi>> {
    let payload: GeosearchResponse =
        serde_json::from_str(body).context("failed to parse Wikipedia geosearch JSON")?;
    Ok(payload
        .query
        .geosearch
        .into_iter()
        .map(|hit| Poi::new(hit.title, hit.lat, hit.lon, SIGHT))
        .collect())
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: Option<String>,
}

/// REST page summary from one language edition.
pub struct WikipediaSummary {
    http: Client,
    lang: String,
    base_url: String,
}

impl WikipediaSummary {
    pub fn new(http: Client, lang: &str) -> Self {
        Self {
            http,
            lang: lang.to_string(),
            base_url: format!("https://{}.wikipedia.org", lang),
        }
    }

    fn summary_url(&self, title: &str) -> String {
        format!("{}/api/rest_v1/page/summary/{}", self.base_url, encode(title))
    }
}

#[async_trait]
impl SummaryStrategy for WikipediaSummary {
    fn name(&self) -> &str {
        &self.lang
    }

    async fn lookup(&self, title: &str) -> Result<Option<String>> {
        let url = self.summary_url(title);
        trace!(%url, "fetching page summary");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {} summary for '{}'", self.lang, title))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let summary: PageSummary = response
                    .json()
                    .await
                    .context("failed to parse page summary JSON")?;
                Ok(summary
                    .extract
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty()))
            }
            status => Err(anyhow!(
                "Wikipedia ({}) returned {} for '{}'",
                self.lang,
                status,
                title
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geosearch_maps_to_sights() {
        let body = r#"{"batchcomplete":"","query":{"geosearch":[
            {"pageid":1,"ns":0,"title":"Tokyo Tower","lat":35.6586,"lon":139.7454,"dist":12.3},
            {"pageid":2,"ns":0,"title":"Zojo-ji","lat":35.6575,"lon":139.7481,"dist":80.1}
        ]}}"#;
        let sights = parse_geosearch(body).unwrap();
        assert_eq!(sights.len(), 2);
        assert_eq!(sights[0].name, "Tokyo Tower");
        assert_eq!(sights[1].category, "sight");
    }

    #[test]
    fn test_parse_geosearch_without_query_is_empty() {
        assert!(parse_geosearch(r#"{"batchcomplete":""}"#).unwrap().is_empty());
    }

    #[test]
    fn test_summary_url_encodes_title() {
        let summary = WikipediaSummary::new(Client::new(), "ja");
        assert_eq!(
            summary.summary_url("Meiji Shrine"),
            "https://ja.wikipedia.org/api/rest_v1/page/summary/Meiji%20Shrine"
        );
    }
}
