use thiserror::Error;

/// Failure of one planning call. Always recoverable at the run level.
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("planner still failing after {attempts} attempts ({status}): {body}")]
    Transient {
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("planner rejected request ({status}): {body}")]
    Permanent { status: u16, body: String },

    #[error("malformed planner response: {0}")]
    Malformed(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request-level failure; these are the only ways a trip request fails.
#[derive(Error, Debug)]
pub enum TripError {
    #[error("Invalid date range")]
    InvalidDateRange,

    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    #[error("No points of interest found")]
    NoPointsOfInterest,

    #[error("Provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type PlanningResult<T> = std::result::Result<T, PlanningError>;
pub type TripResult<T> = std::result::Result<T, TripError>;
