//! Shared local track constructors
//!
//! Each binary owns exactly one outbound video track, created at startup and
//! handed to every session through its context.

use std::sync::Arc;

use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

fn vp8_capability() -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: MIME_TYPE_VP8.to_owned(),
        ..Default::default()
    }
}

/// Sample-based track fed by the file playback loop
pub fn new_playback_track() -> Arc<TrackLocalStaticSample> {
    Arc::new(TrackLocalStaticSample::new(
        vp8_capability(),
        "video".to_owned(),
        "video".to_owned(),
    ))
}

/// RTP pass-through track fed by the loopback relay
pub fn new_loopback_track() -> Arc<TrackLocalStaticRTP> {
    Arc::new(TrackLocalStaticRTP::new(
        vp8_capability(),
        "video".to_owned(),
        "rtc-relay".to_owned(),
    ))
}
