//! # rtc-relay
//!
//! Single-peer WebRTC signaling and media relay demo server.
//!
//! ## Architecture Overview
//!
//! ```text
//!  Browser ── WebSocket /ws ──► server::websocket (read loop)
//!                                      │
//!                                      ▼
//!                            session::negotiation ◄──── tracks::toggle
//!                             offer/answer + full            (5 s add/remove
//!                             ICE gathering                   + renegotiate)
//!                                      │
//!                                      ▼
//!                               engine (RTCPeerConnection)
//!                                │              ▲
//!                     on_track   │              │ write_rtp / write_sample
//!                                ▼              │
//!                          relay::loopback ─────┘        relay::playback
//!                          (forward + 3 s PLI)           (IVF file, paced
//!                                                         by its time-base)
//!
//!  session::monitor watches connection state; `failed` ends the process.
//! ```
//!
//! Two binaries share this library: `playback` streams a prerecorded IVF
//! file while periodically toggling the track's presence, `loopback` relays
//! the browser's own camera video straight back.

pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod tracks;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default HTTP/WebSocket listen port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Seconds between periodic add/remove track toggles
    pub const TOGGLE_INTERVAL_SECS: u64 = 5;

    /// Seconds between keyframe requests on relayed tracks
    pub const PLI_INTERVAL_SECS: u64 = 3;

    /// Default IVF file streamed by the playback binary
    pub const DEFAULT_VIDEO_FILE: &str = "output.ivf";

    /// Scratch buffer size for draining sender-side RTCP
    pub const RTCP_READ_BUFFER: usize = 1500;
}
