//! Gridbot
//!
//! Standalone bot: connects to the game server, authenticates, and plays
//! games with the baseline policy until the connection drops.

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gridbot::{ClientConfig, GameClient, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = ClientConfig::from_env();
    info!("Gridbot v{}", VERSION);
    info!("Server: {}:{}", config.host, config.port);
    info!("Username: {}", config.username);

    let client = GameClient::new(config);
    client
        .run()
        .await
        .context("session ended with a transport error")?;

    info!("Session closed");
    Ok(())
}
