//! Loopback packet relay
//!
//! For every remote track that starts, two tasks run until the session is
//! cancelled: a forward loop copying inbound RTP verbatim onto the shared
//! outbound track in arrival order, and a periodic keyframe-request (PLI)
//! driver aimed at the track's media SSRC so the upstream encoder emits a
//! full frame regardless of downstream viewer behavior.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::TrackLocalWriter;
use webrtc::track::track_remote::TrackRemote;

use crate::error::{MediaError, Result};
use crate::session::SessionContext;

/// Wire the remote-track callback: each started track gets its own forward
/// loop and keyframe-request driver.
pub fn install_loopback(
    ctx: &Arc<SessionContext>,
    outbound: Arc<TrackLocalStaticRTP>,
    pli_interval: Duration,
) {
    let session = ctx.id();
    let shutdown = ctx.shutdown().clone();
    let cancel = ctx.cancel_token().clone();
    // weak reference so the callback does not keep the connection alive
    let pc = Arc::downgrade(ctx.pc());

    ctx.pc().on_track(Box::new(move |track, _receiver, _transceiver| {
        let outbound = Arc::clone(&outbound);
        let shutdown = shutdown.clone();
        let cancel = cancel.clone();
        let pc = Weak::clone(&pc);

        Box::pin(async move {
            let ssrc = track.ssrc();
            tracing::info!(
                %session,
                "Remote track started: kind={}, ssrc={ssrc}",
                track.kind()
            );

            tokio::spawn(run_keyframe_requests(
                pc,
                ssrc,
                pli_interval,
                cancel.clone(),
            ));
            tokio::spawn(async move {
                if let Err(e) = forward_track(track, outbound, cancel).await {
                    shutdown.fatal(e);
                }
            });
        })
    }));
}

/// Ask the upstream encoder for a keyframe every `interval`
async fn run_keyframe_requests(
    pc: Weak<RTCPeerConnection>,
    media_ssrc: u32,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let Some(pc) = pc.upgrade() else { return };
                let pli = PictureLossIndication {
                    sender_ssrc: 0,
                    media_ssrc,
                };
                if let Err(e) = pc.write_rtcp(&[Box::new(pli)]).await {
                    tracing::warn!("Keyframe request failed: {e}");
                    return;
                }
            }
        }
    }
}

/// Copy inbound packets to the outbound track until the remote track ends.
///
/// End-of-stream finishes this track's loop only; any other read error is
/// escalated to fatal by the caller. No buffering, no reordering: outbound
/// order equals arrival order.
async fn forward_track(
    track: Arc<TrackRemote>,
    outbound: Arc<TrackLocalStaticRTP>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = track.read_rtp() => match read {
                Ok((packet, _)) => {
                    if let Err(e) = outbound.write_rtp(&packet).await {
                        // no subscriber currently bound; keep relaying
                        if webrtc::Error::ErrClosedPipe == e {
                            continue;
                        }
                        return Err(MediaError::RtpWrite(e.to_string()).into());
                    }
                }
                Err(e) if is_end_of_stream(&e) => {
                    tracing::info!("Remote track ssrc={} ended", track.ssrc());
                    return Ok(());
                }
                Err(e) => return Err(MediaError::RtpRead(e.to_string()).into()),
            }
        }
    }
}

fn is_end_of_stream(e: &webrtc::Error) -> bool {
    matches!(
        e,
        webrtc::Error::ErrClosedPipe
            | webrtc::Error::ErrConnectionClosed
            | webrtc::Error::Util(webrtc::util::Error::ErrBufferClosed)
    )
}
