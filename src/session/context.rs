//! Per-session shared state
//!
//! One [`SessionContext`] exists per signaling connection and is passed
//! explicitly to every component that acts on the session; nothing about a
//! session lives in process-wide state.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use webrtc::peer_connection::RTCPeerConnection;

use crate::error::SignalError;
use crate::protocol::{SignalingEnvelope, SignalingMode};
use crate::shutdown::ShutdownHandle;

/// Shared state for one peer session
pub struct SessionContext {
    id: Uuid,
    pc: Arc<RTCPeerConnection>,
    mode: SignalingMode,
    outbound: mpsc::UnboundedSender<SignalingEnvelope>,
    /// Serializes negotiation rounds across the periodic toggle driver and
    /// the message-driven reply path, so two triggers cannot interleave
    /// create-offer / set-local-description calls.
    negotiation: Mutex<()>,
    shutdown: ShutdownHandle,
    cancel: CancellationToken,
}

impl SessionContext {
    /// Create a session context plus the receiving end of its outbound
    /// signaling queue (drained by the channel writer task).
    pub fn new(
        pc: Arc<RTCPeerConnection>,
        mode: SignalingMode,
        shutdown: ShutdownHandle,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SignalingEnvelope>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let cancel = shutdown.child_token();
        let ctx = Arc::new(Self {
            id: Uuid::new_v4(),
            pc,
            mode,
            outbound,
            negotiation: Mutex::new(()),
            shutdown,
            cancel,
        });
        (ctx, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pc(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }

    pub fn mode(&self) -> SignalingMode {
        self.mode
    }

    pub fn shutdown(&self) -> &ShutdownHandle {
        &self.shutdown
    }

    /// Queue an envelope for transmission on the signaling channel
    pub fn send(&self, envelope: SignalingEnvelope) -> Result<(), SignalError> {
        self.outbound
            .send(envelope)
            .map_err(|_| SignalError::ChannelClosed)
    }

    pub(crate) async fn lock_negotiation(&self) -> MutexGuard<'_, ()> {
        self.negotiation.lock().await
    }

    /// Token cancelled when this session (or the whole process) shuts down
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// End the session: stop its tasks and close the peer connection
    pub async fn close(&self) {
        self.cancel.cancel();
        if let Err(e) = self.pc.close().await {
            tracing::warn!(session = %self.id, "Peer connection close failed: {e}");
        }
    }
}
