use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::itinerary::{Orchestrator, OpenAiTransport, PlannerClient, RetryPolicy, TokioSleeper, TripPlanner};
use crate::providers::{
    lookup_client, NominatimGeocoder, OverpassClient, SummaryChain, WikipediaGeosearch,
    LOOKUP_TIMEOUT, OVERPASS_TIMEOUT,
};
use crate::shared::config::VoyageConfig;

pub const PLANNER_TIMEOUT: Duration = Duration::from_secs(60);

/// Wires the live providers and planner behind a `TripPlanner`.
pub fn build_trip_planner(config: &VoyageConfig) -> Result<TripPlanner> {
    let lookups = lookup_client(&config.user_agent_email, LOOKUP_TIMEOUT)?;
    let overpass_http = lookup_client(&config.user_agent_email, OVERPASS_TIMEOUT)?;

    let geocoder = NominatimGeocoder::new(lookups.clone(), &config.endpoints.nominatim)?;
    let sights = WikipediaGeosearch::new(lookups.clone(), &config.endpoints.geosearch)?;
    let tags = OverpassClient::new(overpass_http, &config.endpoints.overpass)?;
    let summaries = SummaryChain::wikipedia(lookups);

    let transport = OpenAiTransport::new(
        &config.openai_api_base,
        &config.openai_api_key,
        config.openai_org_id.as_deref(),
        PLANNER_TIMEOUT,
    )?;
    let sleeper = Arc::new(TokioSleeper);
    let planner = PlannerClient::new(
        Arc::new(transport),
        config.openai_model.clone(),
        RetryPolicy::default(),
        sleeper.clone(),
    );
    info!(model = %planner.model(), "planner configured");

    let orchestrator = Orchestrator::new(Arc::new(planner), Arc::new(summaries), sleeper)
        .with_pacing(config.day_pacing);

    Ok(TripPlanner::new(
        Arc::new(geocoder),
        Arc::new(sights),
        Arc::new(tags),
        orchestrator,
    )
    .with_radius(config.search_radius_m)
    .with_max_days(config.max_trip_days))
}
