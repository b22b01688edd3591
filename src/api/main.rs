use anyhow::Result;

use voyagecraft::api::rest::api::run_rest_server;
use voyagecraft::shared::{logging, VoyageConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_path) = VoyageConfig::load()?;

    let _ = logging::init_service_logging(&config.log_dir, "voyagecraft_api");
    tracing::info!("Using config at {}", config_path.display());

    run_rest_server(config).await
}
