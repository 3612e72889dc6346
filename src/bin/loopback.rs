//! Loopback Relay Server
//!
//! Receives camera video from a single browser peer and relays every packet
//! straight back on a shared outbound track, issuing periodic keyframe
//! requests upstream. Signaling is bidirectional: either side may offer.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rtc_relay::{
    config::AppConfig,
    protocol::SignalingMode,
    server::{self, AppState, SessionVariant},
    shutdown::Shutdown,
    tracks::new_loopback_track,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting loopback server");

    let mut config = AppConfig::load()?;
    config.session.mode = SignalingMode::Bidirectional;

    let (shutdown, handle) = Shutdown::new();

    let state = Arc::new(AppState {
        config,
        variant: SessionVariant::Loopback {
            track: new_loopback_track(),
        },
        shutdown: handle.clone(),
    });

    tokio::spawn(async move {
        if let Err(e) = server::serve(state).await {
            handle.fatal(e);
        }
    });

    let code = shutdown.wait().await;
    std::process::exit(code);
}
