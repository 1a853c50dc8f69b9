//! Drowsiness Detection Server - Main Entry Point

use drowsiness_api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    settings.validate()?;
    init_logging(settings.logging.max_level()?, settings.logging.json);

    info!("=== Drowsiness Detection Server v{} ===", env!("CARGO_PKG_VERSION"));

    run_server(settings).await
}
