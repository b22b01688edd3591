use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::info;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::routes::AppState;
use crate::itinerary::{PlanOutcome, TripRequest};

pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TripRequest>, JsonRejection>,
) -> ApiResult<Json<PlanOutcome>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!(
        destination = %request.destination,
        start = %request.start_date,
        end = %request.end_date,
        mode = ?request.mode,
        "plan requested"
    );

    let outcome = state.trips.plan(&request).await?;
    Ok(Json(outcome))
}
