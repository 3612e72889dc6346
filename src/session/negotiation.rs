//! Session description exchange
//!
//! Drives offer/answer rounds against the engine and the signaling channel.
//! A full local description (all ICE candidates gathered) is sent in a single
//! envelope; no trickle. All entry points hold the session's negotiation lock
//! for the whole round.

use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::error::{Error, NegotiationError, SignalError};
use crate::protocol::{SignalEvent, SignalingEnvelope, SignalingMode};
use crate::session::SessionContext;

#[derive(Debug, Clone, Copy)]
enum DescriptionKind {
    Offer,
    Answer,
}

/// Create an offer, wait for ICE gathering to complete, and send the full
/// local description as an `offer` envelope. Nothing is sent on failure.
pub async fn create_and_send_offer(ctx: &SessionContext) -> Result<(), NegotiationError> {
    let _guard = ctx.lock_negotiation().await;
    send_local_description(ctx, DescriptionKind::Offer).await
}

/// Symmetric to [`create_and_send_offer`], emitting an `answer` envelope
pub async fn create_and_send_answer(ctx: &SessionContext) -> Result<(), NegotiationError> {
    let _guard = ctx.lock_negotiation().await;
    send_local_description(ctx, DescriptionKind::Answer).await
}

async fn send_local_description(
    ctx: &SessionContext,
    kind: DescriptionKind,
) -> Result<(), NegotiationError> {
    let pc = ctx.pc();
    let (desc, event) = match kind {
        DescriptionKind::Offer => (
            pc.create_offer(None)
                .await
                .map_err(|e| NegotiationError::CreateOffer(e.to_string()))?,
            SignalEvent::Offer,
        ),
        DescriptionKind::Answer => (
            pc.create_answer(None)
                .await
                .map_err(|e| NegotiationError::CreateAnswer(e.to_string()))?,
            SignalEvent::Answer,
        ),
    };

    // Gathering must finish before the description is serialized, so the
    // envelope carries every candidate and the browser needs no trickle.
    let mut gather_complete = pc.gathering_complete_promise().await;
    pc.set_local_description(desc)
        .await
        .map_err(|e| NegotiationError::SetLocal(e.to_string()))?;
    let _ = gather_complete.recv().await;

    let local = pc
        .local_description()
        .await
        .ok_or(NegotiationError::MissingLocalDescription)?;
    let data = serde_json::to_string(&local)?;

    ctx.send(SignalingEnvelope::new(event, data))
        .map_err(|_| NegotiationError::ChannelClosed)
}

/// Apply one inbound signaling envelope.
///
/// The payload is deserialized first; a malformed description yields a decode
/// error without touching negotiation state. Dispatch then depends on the
/// session's [`SignalingMode`]:
///
/// - one-way: only `answer` is applied, everything else is ignored
/// - bidirectional: `offer` and `answer` are both applied and reciprocated,
///   so either side can propose a track change and the round trip always
///   completes
pub async fn apply_remote_envelope(
    ctx: &SessionContext,
    envelope: SignalingEnvelope,
) -> Result<(), Error> {
    let desc: RTCSessionDescription =
        serde_json::from_str(&envelope.data).map_err(SignalError::Decode)?;

    let _guard = ctx.lock_negotiation().await;
    match (ctx.mode(), envelope.event) {
        (SignalingMode::OneWay, SignalEvent::Answer) => {
            apply_remote_description(ctx, desc).await?;
        }
        (SignalingMode::Bidirectional, SignalEvent::Answer) => {
            apply_remote_description(ctx, desc).await?;
            send_local_description(ctx, DescriptionKind::Offer).await?;
        }
        (SignalingMode::Bidirectional, SignalEvent::Offer) => {
            apply_remote_description(ctx, desc).await?;
            send_local_description(ctx, DescriptionKind::Answer).await?;
        }
        (_, event) => {
            tracing::debug!(session = %ctx.id(), "Ignoring signaling event '{event}'");
        }
    }
    Ok(())
}

async fn apply_remote_description(
    ctx: &SessionContext,
    desc: RTCSessionDescription,
) -> Result<(), NegotiationError> {
    ctx.pc()
        .set_remote_description(desc)
        .await
        .map_err(|e| NegotiationError::SetRemote(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::engine;
    use crate::shutdown::Shutdown;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const GATHER_TIMEOUT: Duration = Duration::from_secs(10);

    async fn test_context(
        mode: SignalingMode,
    ) -> (
        Arc<SessionContext>,
        mpsc::UnboundedReceiver<SignalingEnvelope>,
    ) {
        let (_shutdown, handle) = Shutdown::new();
        let pc = engine::new_peer_connection(&SessionConfig::default())
            .await
            .unwrap();
        SessionContext::new(pc, mode, handle)
    }

    /// Produce a valid answer for `offer_data` using a second in-process peer
    async fn answer_for(offer_data: &str) -> String {
        let pc = engine::new_peer_connection(&SessionConfig::default())
            .await
            .unwrap();
        let offer: RTCSessionDescription = serde_json::from_str(offer_data).unwrap();
        pc.set_remote_description(offer).await.unwrap();
        let answer = pc.create_answer(None).await.unwrap();
        serde_json::to_string(&answer).unwrap()
    }

    #[tokio::test]
    async fn test_offer_description_serde_round_trip() {
        let (ctx, _rx) = test_context(SignalingMode::OneWay).await;
        ctx.pc().create_data_channel("control", None).await.unwrap();
        let offer = ctx.pc().create_offer(None).await.unwrap();

        let text = serde_json::to_string(&offer).unwrap();
        let decoded: RTCSessionDescription = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.sdp_type, offer.sdp_type);
        assert_eq!(decoded.sdp, offer.sdp);
    }

    #[tokio::test]
    async fn test_offer_sent_as_single_envelope() {
        let (ctx, mut rx) = test_context(SignalingMode::OneWay).await;
        ctx.pc().create_data_channel("control", None).await.unwrap();

        timeout(GATHER_TIMEOUT, create_and_send_offer(&ctx))
            .await
            .unwrap()
            .unwrap();

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.event, SignalEvent::Offer);
        assert!(rx.try_recv().is_err());

        // the transmitted description is the gathered local description
        let sent: RTCSessionDescription = serde_json::from_str(&envelope.data).unwrap();
        let local = ctx.pc().local_description().await.unwrap();
        assert_eq!(sent.sdp, local.sdp);
    }

    #[tokio::test]
    async fn test_one_way_answer_applied_without_reply() {
        let (ctx, mut rx) = test_context(SignalingMode::OneWay).await;
        ctx.pc().create_data_channel("control", None).await.unwrap();

        timeout(GATHER_TIMEOUT, create_and_send_offer(&ctx))
            .await
            .unwrap()
            .unwrap();
        let offer_envelope = rx.try_recv().unwrap();

        let answer = answer_for(&offer_envelope.data).await;
        apply_remote_envelope(
            &ctx,
            SignalingEnvelope::new(SignalEvent::Answer, answer.clone()),
        )
        .await
        .unwrap();

        let expected: RTCSessionDescription = serde_json::from_str(&answer).unwrap();
        let remote = ctx.pc().remote_description().await.unwrap();
        assert_eq!(remote.sdp, expected.sdp);
        // one-way mode never reciprocates
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bidirectional_offer_gets_one_answer() {
        let (ctx, mut rx) = test_context(SignalingMode::Bidirectional).await;

        let remote = engine::new_peer_connection(&SessionConfig::default())
            .await
            .unwrap();
        remote.create_data_channel("control", None).await.unwrap();
        let offer = remote.create_offer(None).await.unwrap();
        let data = serde_json::to_string(&offer).unwrap();

        timeout(
            GATHER_TIMEOUT,
            apply_remote_envelope(&ctx, SignalingEnvelope::new(SignalEvent::Offer, data)),
        )
        .await
        .unwrap()
        .unwrap();

        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.event, SignalEvent::Answer);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_data_leaves_state_untouched() {
        let (ctx, mut rx) = test_context(SignalingMode::OneWay).await;

        let result = apply_remote_envelope(
            &ctx,
            SignalingEnvelope::new(SignalEvent::Answer, "{not valid".into()),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Signal(SignalError::Decode(_)))
        ));
        assert!(ctx.pc().remote_description().await.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_event_ignored() {
        let (ctx, _rx) = test_context(SignalingMode::OneWay).await;

        let remote = engine::new_peer_connection(&SessionConfig::default())
            .await
            .unwrap();
        remote.create_data_channel("control", None).await.unwrap();
        let offer = remote.create_offer(None).await.unwrap();
        let data = serde_json::to_string(&offer).unwrap();

        apply_remote_envelope(&ctx, SignalingEnvelope::new(SignalEvent::Unknown, data))
            .await
            .unwrap();
        assert!(ctx.pc().remote_description().await.is_none());
    }
}
