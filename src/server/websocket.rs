//! WebSocket signaling sessions
//!
//! One session per connected browser: a peer connection, a writer task
//! draining the session's outbound envelope queue, the variant-specific
//! drivers, and the inbound read loop. The read loop ending (close or
//! transport error) tears the whole session down; decode and apply failures
//! are logged and the session continues in its prior negotiated state.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;

use crate::engine;
use crate::error::{Result, SignalError, TrackError};
use crate::protocol::SignalingEnvelope;
use crate::relay::install_loopback;
use crate::server::router::{AppState, SessionVariant};
use crate::session::{install_state_monitor, negotiation, SessionContext};
use crate::tracks::run_toggle_loop;

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

async fn handle_session(socket: WebSocket, state: Arc<AppState>) {
    if let Err(e) = run_session(socket, state).await {
        tracing::warn!("Session ended with error: {e}");
    }
}

async fn run_session(socket: WebSocket, state: Arc<AppState>) -> Result<()> {
    let pc = engine::new_peer_connection(&state.config.session).await?;
    let (ctx, outbound_rx) =
        SessionContext::new(pc, state.config.session.mode, state.shutdown.clone());
    tracing::info!(session = %ctx.id(), "Signaling session opened");

    install_state_monitor(&ctx);

    match &state.variant {
        SessionVariant::Playback { track } => {
            // keeps the SDP non-empty while the video track is toggled off
            ctx.pc().create_data_channel("control", None).await?;

            let toggle_ctx = Arc::clone(&ctx);
            let track = Arc::clone(track);
            let interval = state.config.session.toggle_interval();
            let shutdown = state.shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = run_toggle_loop(toggle_ctx, track, interval).await {
                    shutdown.fatal(e);
                }
            });
        }
        SessionVariant::Loopback { track } => {
            install_loopback(&ctx, Arc::clone(track), state.config.session.pli_interval());
            let sender = ctx
                .pc()
                .add_track(Arc::clone(track) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(|e| TrackError::AddFailed(e.to_string()))?;
            drain_sender_rtcp(sender, ctx.cancel_token().clone());
        }
    }

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(run_channel_writer(sink, outbound_rx));

    negotiation::create_and_send_offer(&ctx).await?;

    // engine-driven renegotiation (e.g. the browser toggling its camera);
    // installed after the initial offer so the setup above fires no event
    if let SessionVariant::Loopback { .. } = state.variant {
        install_negotiation_needed(&ctx);
    }

    if let Err(e) = run_read_loop(stream, &ctx).await {
        tracing::info!(session = %ctx.id(), "Signaling channel ended: {e}");
    }

    ctx.close().await;
    writer.abort();
    tracing::info!(session = %ctx.id(), "Signaling session closed");
    Ok(())
}

/// Drain the outbound envelope queue into the socket
async fn run_channel_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<SignalingEnvelope>,
) {
    while let Some(envelope) = rx.recv().await {
        let text = match envelope.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to encode envelope: {e}");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            tracing::info!("Signaling write failed, stopping writer: {e}");
            return;
        }
    }
}

/// Apply inbound messages until close, cancellation, or a transport error.
/// Only the transport error is worth reporting; the other two are the
/// ordinary ends of a session.
async fn run_read_loop(
    mut stream: SplitStream<WebSocket>,
    ctx: &Arc<SessionContext>,
) -> std::result::Result<(), SignalError> {
    loop {
        tokio::select! {
            _ = ctx.cancel_token().cancelled() => return Ok(()),
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let envelope = match SignalingEnvelope::decode(&text) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            tracing::warn!(session = %ctx.id(), "Dropping malformed message: {e}");
                            continue;
                        }
                    };
                    let event = envelope.event;
                    if let Err(e) = negotiation::apply_remote_envelope(ctx, envelope).await {
                        // prior negotiated state still stands: stale, not corrupted
                        tracing::warn!(session = %ctx.id(), "Applying '{event}' failed: {e}");
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(SignalError::Transport(e.to_string())),
            }
        }
    }
}

/// RTCP arriving on our sender must be read for the interceptors to run
fn drain_sender_rtcp(sender: Arc<RTCRtpSender>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut buf = vec![0u8; crate::constants::RTCP_READ_BUFFER];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                read = sender.read(&mut buf) => {
                    if read.is_err() {
                        return;
                    }
                }
            }
        }
    });
}

fn install_negotiation_needed(ctx: &Arc<SessionContext>) {
    let weak = Arc::downgrade(ctx);
    ctx.pc().on_negotiation_needed(Box::new(move || {
        let weak = weak.clone();
        Box::pin(async move {
            let Some(ctx) = weak.upgrade() else { return };
            tracing::debug!(session = %ctx.id(), "Renegotiation requested by engine");
            if let Err(e) = negotiation::create_and_send_offer(&ctx).await {
                tracing::warn!(session = %ctx.id(), "Renegotiation failed: {e}");
            }
        })
    }));
}
