//! Local track construction and lifecycle

pub mod local;
pub mod toggle;

pub use local::{new_loopback_track, new_playback_track};
pub use toggle::{run_toggle_loop, TrackChange, TrackToggle};
