pub mod config;
pub mod logging;
pub mod services;

pub use config::VoyageConfig;
pub use services::build_trip_planner;
