use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::warn;

use crate::itinerary::TripError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<TripError> for ApiError {
    fn from(e: TripError) -> Self {
        match e {
            TripError::InvalidDateRange => ApiError::BadRequest(e.to_string()),
            TripError::DestinationNotFound(_) | TripError::NoPointsOfInterest => {
                ApiError::NotFound(e.to_string())
            }
            TripError::Provider(inner) => {
                warn!("upstream lookup failed: {:#}", inner);
                ApiError::BadGateway(format!("Upstream lookup failed: {}", inner))
            }
        }
    }
}
