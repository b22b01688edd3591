pub mod assembler;
pub mod coverage;
pub mod dates;
pub mod dedup;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod pool;
pub mod retry;
pub mod scoring;
pub mod trip;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PlanningError, TripError};
pub use models::{Day, DayPlan, Plan, PlanMode, PlanOutcome, Poi, RunContext, Totals};
pub use orchestrator::Orchestrator;
pub use planner::{DayPlanner, OpenAiTransport, PlannerClient};
pub use pool::CandidatePools;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use trip::{TripPlanner, TripRequest};
