//! HTTP routes
//!
//! Two endpoints only: `/` serves the embedded browser page for the running
//! variant, `/ws` upgrades to the signaling channel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::config::AppConfig;
use crate::error::Result;
use crate::server::websocket::ws_upgrade;
use crate::shutdown::ShutdownHandle;

/// Which demo pipeline new sessions get wired into
#[derive(Clone)]
pub enum SessionVariant {
    /// Stream the prerecorded file on the shared sample track, with the
    /// periodic add/remove toggle driver
    Playback { track: Arc<TrackLocalStaticSample> },
    /// Relay the browser's own media back out on the shared RTP track
    Loopback { track: Arc<TrackLocalStaticRTP> },
}

/// Shared router state
pub struct AppState {
    pub config: AppConfig,
    pub variant: SessionVariant,
    pub shutdown: ShutdownHandle,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_page(State(state): State<Arc<AppState>>) -> Html<&'static str> {
    Html(match state.variant {
        SessionVariant::Playback { .. } => include_str!("../../assets/playback.html"),
        SessionVariant::Loopback { .. } => include_str!("../../assets/loopback.html"),
    })
}

/// Bind and serve until the process shuts down
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.server.bind_address, state.config.server.http_port
    )
    .parse()
    .map_err(|e| crate::error::Error::Config(format!("invalid listen address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
