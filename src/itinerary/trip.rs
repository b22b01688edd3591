use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::dates::{date_range, day_span};
use super::dedup::dedupe_by_name;
use super::error::{TripError, TripResult};
use super::models::{normalize_interests, PlanMode, PlanOutcome, Poi, RunContext};
use super::orchestrator::Orchestrator;
use super::pool::CandidatePools;
use crate::providers::{Geocoder, SightSearch, TagSearch};

pub const DEFAULT_SEARCH_RADIUS_M: u32 = 5000;
pub const SIGHT_SEARCH_LIMIT: u32 = 40;
pub const DEFAULT_MAX_TRIP_DAYS: usize = 30;
const SIGHTS_KEPT: usize = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct TripRequest {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub mode: PlanMode,
}

/// Request-level flow: resolve the destination, gather candidates, then plan.
pub struct TripPlanner {
    geocoder: Arc<dyn Geocoder>,
    sights: Arc<dyn SightSearch>,
    tags: Arc<dyn TagSearch>,
    orchestrator: Orchestrator,
    radius_m: u32,
    max_days: usize,
}

impl TripPlanner {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        sights: Arc<dyn SightSearch>,
        tags: Arc<dyn TagSearch>,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            geocoder,
            sights,
            tags,
            orchestrator,
            radius_m: DEFAULT_SEARCH_RADIUS_M,
            max_days: DEFAULT_MAX_TRIP_DAYS,
        }
    }

    pub fn with_radius(mut self, radius_m: u32) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Longest accepted trip; longer ranges are rejected as invalid.
    pub fn with_max_days(mut self, max_days: usize) -> Self {
        self.max_days = max_days;
        self
    }

    pub async fn plan(&self, request: &TripRequest) -> TripResult<PlanOutcome> {
        let mut ctx = self.prepare(request).await?;
        Ok(self.orchestrator.plan(&mut ctx, request.mode).await)
    }

    /// Builds the run context, failing only on bad or overlong dates, an
    /// unknown destination, or a destination with nothing to see.
    pub async fn prepare(&self, request: &TripRequest) -> TripResult<RunContext> {
        match day_span(&request.start_date, &request.end_date) {
            Some(days) if days <= self.max_days => {}
            Some(days) => {
                warn!(days, max_days = self.max_days, "rejecting overlong trip");
                return Err(TripError::InvalidDateRange);
            }
            None => return Err(TripError::InvalidDateRange),
        }
        let dates = date_range(&request.start_date, &request.end_date);
        let interests = normalize_interests(&request.interests);

        let center = self
            .geocoder
            .resolve(&request.destination)
            .await?
            .ok_or_else(|| TripError::DestinationNotFound(request.destination.clone()))?;
        info!(destination = %request.destination, lat = center.lat, lon = center.lon, "resolved destination");

        let sights = self
            .sights
            .nearby(center, self.radius_m, SIGHT_SEARCH_LIMIT)
            .await?;
        let mut sights = dedupe_by_name(&sights);
        sights.truncate(SIGHTS_KEPT);

        let mut by_interest: HashMap<String, Vec<Poi>> = HashMap::new();
        for interest in &interests {
            let found = match self.tags.search(center, interest, self.radius_m).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(interest = %interest, "tag search failed, continuing without it: {:#}", e);
                    Vec::new()
                }
            };
            by_interest.insert(interest.clone(), found);
        }

        if sights.is_empty() && by_interest.values().all(Vec::is_empty) {
            return Err(TripError::NoPointsOfInterest);
        }

        info!(
            sights = sights.len(),
            interests = ?by_interest.iter().map(|(k, v)| (k.as_str(), v.len())).collect::<Vec<_>>(),
            "gathered candidates"
        );
        let pools = CandidatePools::from_sources(by_interest, &sights);
        Ok(RunContext::new(
            request.destination.clone(),
            dates,
            interests,
            pools,
        ))
    }
}
