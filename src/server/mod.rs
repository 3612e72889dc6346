//! HTTP and WebSocket signaling surface

pub mod router;
pub mod websocket;

pub use router::{serve, AppState, SessionVariant};
