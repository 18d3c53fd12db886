use flare_album_core::load_config;
use flare_album_core::tracing::init_tracing_from_config;
use flare_album_relay::ApplicationBootstrap;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = load_config(Some("config"));
    init_tracing_from_config(Some(&app_config.logging));

    info!("Starting Album Relay");

    if let Err(err) = ApplicationBootstrap::run(app_config).await {
        error!(error = %err, "Album relay terminated");
        return Err(err);
    }
    Ok(())
}
