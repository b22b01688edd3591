use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use crate::api::rest::routes::{create_router, AppState};
use crate::shared::{build_trip_planner, VoyageConfig};

pub async fn run_rest_server(config: VoyageConfig) -> Result<()> {
    info!(
        r#"
__   __                              __ _
\ \ / /__ _  _ __ _ __ _ ___ __ _ _ / _| |_
 \ V / _ \ || / _` / _` / -_) _| '_|  _|  _|
  \_/\___/\_, \__,_\__, \___\__|_| |_|  \__|
          |__/     |___/
Starting VoyageCraft planning API...
Model: {}
"#,
        config.openai_model
    );

    let trips = build_trip_planner(&config)?;
    let app = create_router(Arc::new(AppState { trips }));

    info!("Binding to: {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    info!("API started successfully!");
    info!("Plan endpoint: http://{}/plan", config.bind_addr);
    info!("Ready to accept requests...");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Could not listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down VoyageCraft API...");
        })
        .await?;
    Ok(())
}
