//! Sensor Station - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Sensor Station v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Storing readings in {}", settings.database.path.display());

    run_server(settings).await
}
