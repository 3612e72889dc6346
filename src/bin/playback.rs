//! File Playback Server
//!
//! Streams a prerecorded IVF video file to a single browser peer while
//! periodically toggling the track's presence on the connection, exercising
//! renegotiation on every change. Exits 0 once the file has been fully sent.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rtc_relay::{
    config::AppConfig,
    protocol::SignalingMode,
    relay::play_file,
    server::{self, AppState, SessionVariant},
    shutdown::Shutdown,
    tracks::new_playback_track,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting playback server");

    let mut config = AppConfig::load()?;
    config.session.mode = SignalingMode::OneWay;
    if let Some(path) = std::env::args().nth(1) {
        config.playback.file = path.into();
    }

    let (shutdown, handle) = Shutdown::new();
    let video_track = new_playback_track();

    // one playback pipeline feeds every session's copy of the shared track
    {
        let track = Arc::clone(&video_track);
        let file = config.playback.file.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = play_file(&file, track, handle.clone()).await {
                handle.fatal(e);
            }
        });
    }

    let state = Arc::new(AppState {
        config,
        variant: SessionVariant::Playback { track: video_track },
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
