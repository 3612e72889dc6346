//! Connection state monitor
//!
//! Observes engine-level connection state transitions. `failed` is terminal
//! for the whole process: no retry, no ICE restart.

use std::sync::Arc;

use uuid::Uuid;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

use crate::error::Error;
use crate::session::SessionContext;
use crate::shutdown::ShutdownHandle;

/// Install the state-change callback on the session's peer connection
pub fn install_state_monitor(ctx: &Arc<SessionContext>) {
    let shutdown = ctx.shutdown().clone();
    let session = ctx.id();
    ctx.pc()
        .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            observe_state(session, state, &shutdown);
            Box::pin(async {})
        }));
}

fn observe_state(session: Uuid, state: RTCPeerConnectionState, shutdown: &ShutdownHandle) {
    tracing::info!(%session, "Peer connection state: {state}");
    if state == RTCPeerConnectionState::Failed {
        shutdown.fatal(Error::ConnectionFailed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::Shutdown;

    #[tokio::test]
    async fn test_failed_state_ends_process_with_error() {
        let (shutdown, handle) = Shutdown::new();
        observe_state(Uuid::new_v4(), RTCPeerConnectionState::Failed, &handle);
        assert_eq!(shutdown.wait().await, 1);
    }

    #[tokio::test]
    async fn test_other_states_only_log() {
        let (shutdown, handle) = Shutdown::new();
        let session = Uuid::new_v4();
        observe_state(session, RTCPeerConnectionState::Connecting, &handle);
        observe_state(session, RTCPeerConnectionState::Connected, &handle);
        observe_state(session, RTCPeerConnectionState::Disconnected, &handle);

        // nothing queued before this, so completion is the first reason
        handle.complete();
        assert_eq!(shutdown.wait().await, 0);
    }
}
