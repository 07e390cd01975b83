use anyhow::Result;
use clinigate::{config::Config, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let metrics_handle = telemetry::init(&config.telemetry);

    info!("Starting CliniGate tenant security core");
    info!("HTTP server listening on {}", config.http_addr());

    server::run(config, metrics_handle).await
}
