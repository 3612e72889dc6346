//! Track lifecycle controller
//!
//! Periodically toggles the shared local track on and off the peer connection
//! and renegotiates after every toggle. Failures here are unrecoverable: a
//! toggle or offer that cannot be announced leaves the two sides permanently
//! inconsistent, so errors propagate out and the session supervisor escalates
//! them to fatal.

use std::sync::Arc;
use std::time::Duration;

use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use crate::error::{Error, Result, TrackError};
use crate::session::{negotiation, SessionContext};

/// What a toggle did to the peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackChange {
    Added(String),
    Removed(String),
}

/// Two-state toggle over the shared local track.
///
/// The held [`RTCRtpSender`] is only valid between a successful add and the
/// matching remove; `toggle` takes it out before removing so it can never be
/// reused.
pub struct TrackToggle {
    track: Arc<TrackLocalStaticSample>,
    sender: Option<Arc<RTCRtpSender>>,
}

impl TrackToggle {
    pub fn new(track: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            track,
            sender: None,
        }
    }

    pub fn has_track(&self) -> bool {
        self.sender.is_some()
    }

    /// Flip track presence: add when absent, remove when present
    pub async fn toggle(
        &mut self,
        pc: &RTCPeerConnection,
    ) -> std::result::Result<TrackChange, TrackError> {
        match self.sender.take() {
            None => {
                let sender = pc
                    .add_track(Arc::clone(&self.track) as Arc<dyn TrackLocal + Send + Sync>)
                    .await
                    .map_err(|e| TrackError::AddFailed(e.to_string()))?;
                self.sender = Some(sender);
                Ok(TrackChange::Added(self.track.id().to_string()))
            }
            Some(sender) => {
                pc.remove_track(&sender)
                    .await
                    .map_err(|e| TrackError::RemoveFailed(e.to_string()))?;
                Ok(TrackChange::Removed(self.track.id().to_string()))
            }
        }
    }
}

/// Announce a track change to the peer by issuing a fresh offer.
///
/// Single renegotiation point for every kind of change, whether it came from
/// the periodic toggle or an engine notification.
pub async fn handle_track_change(ctx: &SessionContext, change: TrackChange) -> Result<()> {
    match &change {
        TrackChange::Added(id) => {
            tracing::info!(session = %ctx.id(), "Track '{id}' added, renegotiating");
        }
        TrackChange::Removed(id) => {
            tracing::info!(session = %ctx.id(), "Track '{id}' removed, renegotiating");
        }
    }
    negotiation::create_and_send_offer(ctx).await?;
    Ok(())
}

/// Periodic toggle driver: one toggle plus one offer per interval, until the
/// session is cancelled. Any error ends the loop and is escalated by the
/// caller.
pub async fn run_toggle_loop(
    ctx: Arc<SessionContext>,
    track: Arc<TrackLocalStaticSample>,
    interval: Duration,
) -> Result<()> {
    let mut toggle = TrackToggle::new(track);
    let mut ticker = tokio::time::interval(interval);
    // interval fires immediately; the first toggle belongs a full period out
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ctx.cancel_token().cancelled() => return Ok(()),
            _ = ticker.tick() => {
                let change = toggle.toggle(ctx.pc()).await.map_err(Error::Track)?;
                handle_track_change(&ctx, change).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::engine;
    use crate::protocol::{SignalEvent, SignalingMode};
    use crate::shutdown::Shutdown;
    use crate::tracks::new_playback_track;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_toggle_round_trip_restores_state() {
        let pc = engine::new_peer_connection(&SessionConfig::default())
            .await
            .unwrap();
        let mut toggle = TrackToggle::new(new_playback_track());
        assert!(!toggle.has_track());

        let change = toggle.toggle(&pc).await.unwrap();
        assert_eq!(change, TrackChange::Added("video".to_string()));
        assert!(toggle.has_track());

        let change = toggle.toggle(&pc).await.unwrap();
        assert_eq!(change, TrackChange::Removed("video".to_string()));
        assert!(!toggle.has_track());
    }

    #[tokio::test]
    async fn test_toggle_cycle_emits_offer() {
        let (_shutdown, handle) = Shutdown::new();
        let pc = engine::new_peer_connection(&SessionConfig::default())
            .await
            .unwrap();
        let (ctx, mut rx) = SessionContext::new(pc, SignalingMode::OneWay, handle);

        let mut toggle = TrackToggle::new(new_playback_track());
        let change = toggle.toggle(ctx.pc()).await.unwrap();
        timeout(
            std::time::Duration::from_secs(10),
            handle_track_change(&ctx, change),
        )
        .await
        .unwrap()
        .unwrap();

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.event, SignalEvent::Offer);
    }
}
