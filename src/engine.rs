//! Peer connection factory
//!
//! Thin wrapper over the `webrtc` crate: default codecs, default interceptors,
//! ICE servers from configuration. Everything below the negotiation API
//! (ICE/DTLS/SRTP, RTP/RTCP plumbing) is the engine's business.

use std::sync::Arc;

use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::RTCPeerConnection;

use crate::config::SessionConfig;
use crate::error::Result;

/// Build a fresh peer connection for one signaling session
pub async fn new_peer_connection(config: &SessionConfig) -> Result<Arc<RTCPeerConnection>> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let ice_servers = if config.stun_servers.is_empty() {
        Vec::new()
    } else {
        vec![RTCIceServer {
            urls: config.stun_servers.clone(),
            ..Default::default()
        }]
    };

    let pc = api
        .new_peer_connection(RTCConfiguration {
            ice_servers,
            ..Default::default()
        })
        .await?;

    Ok(Arc::new(pc))
}
