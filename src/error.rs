//! Error types for the signaling and relay server

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Signaling error: {0}")]
    Signal(#[from] SignalError),

    #[error("Negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Track error: {0}")]
    Track(#[from] TrackError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Engine error: {0}")]
    Engine(#[from] webrtc::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Peer connection entered the failed state")]
    ConnectionFailed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signaling channel errors
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Malformed envelope or description: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Signaling channel closed")]
    ChannelClosed,

    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Session description exchange errors
#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("Offer creation failed: {0}")]
    CreateOffer(String),

    #[error("Answer creation failed: {0}")]
    CreateAnswer(String),

    #[error("Setting local description failed: {0}")]
    SetLocal(String),

    #[error("Setting remote description failed: {0}")]
    SetRemote(String),

    #[error("Local description unavailable after gathering")]
    MissingLocalDescription,

    #[error("Description serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Signaling channel closed before send")]
    ChannelClosed,
}

/// Track lifecycle errors
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Adding track failed: {0}")]
    AddFailed(String),

    #[error("Removing track failed: {0}")]
    RemoveFailed(String),
}

/// Media relay and playback errors
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("RTP read failed: {0}")]
    RtpRead(String),

    #[error("RTP write failed: {0}")]
    RtpWrite(String),

    #[error("Media file open failed: {0}")]
    FileOpen(String),

    #[error("Media frame read failed: {0}")]
    FrameRead(String),

    #[error("Media frame parse failed: {0}")]
    FrameParse(String),

    #[error("Sample write failed: {0}")]
    SampleWrite(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
