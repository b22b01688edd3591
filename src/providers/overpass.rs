use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::{GeoPoint, TagSearch};
use crate::itinerary::dedup::{dedupe_by_name, filter_chains};
use crate::itinerary::models::Poi;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const INTEREST_RESULT_LIMIT: usize = 40;
pub const INTEREST_KEEP_AT_LEAST: usize = 12;

/// OSM tag key plus a value regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRule {
    pub key: &'static str,
    pub pattern: &'static str,
}

const fn rule(key: &'static str, pattern: &'static str) -> TagRule {
    TagRule { key, pattern }
}

const FOOD_RULES: &[TagRule] = &[rule(
    "amenity",
    "restaurant|cafe|fast_food|ice_cream|bakery|food_court",
)];
const HISTORY_RULES: &[TagRule] = &[
    rule("historic", ".+"),
    rule("memorial", ".+"),
    rule("tourism", "museum"),
    rule("tourism", "gallery"),
    rule("heritage", ".+"),
];
const NATURE_RULES: &[TagRule] = &[
    rule("leisure", "park|garden"),
    rule("natural", "wood|water|beach"),
    rule("tourism", "viewpoint"),
];
const ART_RULES: &[TagRule] = &[
    rule("tourism", "gallery|museum"),
    rule("amenity", "theatre|arts_centre"),
];
const SHOPPING_RULES: &[TagRule] = &[rule(
    "shop",
    "department_store|mall|supermarket|marketplace|convenience|boutique",
)];
const RELIGION_RULES: &[TagRule] = &[
    rule("amenity", "place_of_worship"),
    rule("religion", ".+"),
];
const NIGHTLIFE_RULES: &[TagRule] = &[rule("amenity", "bar|pub|nightclub")];

/// Used for interests outside the known set.
pub const DEFAULT_RULES: &[TagRule] = &[rule("tourism", "attraction|museum|gallery")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterestTag {
    Food,
    History,
    Nature,
    Art,
    Shopping,
    Religion,
    Nightlife,
}

impl InterestTag {
    pub const ALL: [InterestTag; 7] = [
        InterestTag::Food,
        InterestTag::History,
        InterestTag::Nature,
        InterestTag::Art,
        InterestTag::Shopping,
        InterestTag::Religion,
        InterestTag::Nightlife,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterestTag::Food => "food",
            InterestTag::History => "history",
            InterestTag::Nature => "nature",
            InterestTag::Art => "art",
            InterestTag::Shopping => "shopping",
            InterestTag::Religion => "religion",
            InterestTag::Nightlife => "nightlife",
        }
    }

    pub fn rules(&self) -> &'static [TagRule] {
        match self {
            InterestTag::Food => FOOD_RULES,
            InterestTag::History => HISTORY_RULES,
            InterestTag::Nature => NATURE_RULES,
            InterestTag::Art => ART_RULES,
            InterestTag::Shopping => SHOPPING_RULES,
            InterestTag::Religion => RELIGION_RULES,
            InterestTag::Nightlife => NIGHTLIFE_RULES,
        }
    }
}

impl FromStr for InterestTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        InterestTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| anyhow!("unknown interest tag '{}'", s))
    }
}

pub fn rules_for(interest: &str) -> &'static [TagRule] {
    interest
        .parse::<InterestTag>()
        .map(|tag| tag.rules())
        .unwrap_or(DEFAULT_RULES)
}

fn validate_rules() -> Result<()> {
    let all = InterestTag::ALL
        .iter()
        .flat_map(|tag| tag.rules().iter())
        .chain(DEFAULT_RULES.iter());
    for rule in all {
        Regex::new(rule.pattern)
            .with_context(|| format!("invalid tag pattern for key '{}'", rule.key))?;
        if rule.key.is_empty() || rule.pattern.contains('"') {
            return Err(anyhow!("tag rule for '{}' cannot be quoted", rule.key));
        }
    }
    Ok(())
}

/// Union of node and way clauses around a point for each rule.
pub fn build_query(center: GeoPoint, radius_m: u32, rules: &[TagRule]) -> String {
    let mut blocks = Vec::with_capacity(rules.len() * 2);
    for rule in rules {
        for element in ["node", "way"] {
            blocks.push(format!(
                "  {}(around:{},{},{})[\"{}\"~\"{}\"];",
                element, radius_m, center.lat, center.lon, rule.key, rule.pattern
            ));
        }
    }
    format!(
        "[out:json][timeout:25];\n(\n{}\n);\nout center 60;",
        blocks.join("\n")
    )
}

#[derive(Debug, Default, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    center: Option<Center>,
    #[serde(default)]
    tags: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Named elements with coordinates (their own, or the way's center).
pub fn parse_elements(body: &str, interest: &str) -> Result<Vec<Poi>> {
    let payload: OverpassResponse =
        serde_json::from_str(body).context("failed to parse Overpass response JSON")?;
    let category = interest.to_lowercase();

    let items = payload
        .elements
        .into_iter()
        .filter_map(|element| {
            let name = ["name", "brand"]
                .iter()
                .filter_map(|key| element.tags.get(*key).and_then(Value::as_str))
                .find(|value| !value.trim().is_empty())?
                .to_string();
            let lat = element
                .lat
                .or_else(|| element.center.as_ref().and_then(|c| c.lat))?;
            let lon = element
                .lon
                .or_else(|| element.center.as_ref().and_then(|c| c.lon))?;
            Some(Poi::new(name, lat, lon, category.clone()))
        })
        .collect();
    Ok(items)
}

pub struct OverpassClient {
    http: Client,
    url: String,
}

impl OverpassClient {
    /// Fails if any built-in tag rule is not a usable pattern.
    pub fn new(http: Client, url: &str) -> Result<Self> {
        validate_rules()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl TagSearch for OverpassClient {
    async fn search(&self, center: GeoPoint, interest: &str, radius_m: u32) -> Result<Vec<Poi>> {
        let query = build_query(center, radius_m, rules_for(interest));
        trace!(interest, %query, "querying Overpass");

        let response = self
            .http
            .post(&self.url)
            .body(query)
            .send()
            .await
            .with_context(|| format!("failed to call Overpass for interest '{}'", interest))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Overpass returned {} for interest '{}' (body: {})",
                status,
                interest,
                body
            ));
        }

        let body = response
            .text()
            .await
            .context("failed to read Overpass response")?;
        let mut items = dedupe_by_name(&parse_elements(&body, interest)?);
        items.truncate(INTEREST_RESULT_LIMIT);
        let items = filter_chains(&items, INTEREST_KEEP_AT_LEAST);
        debug!(interest, count = items.len(), "fetched interest POIs");
        Ok(items)
    }
}
