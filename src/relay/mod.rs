//! Media relay loops

pub mod loopback;
pub mod playback;

pub use loopback::install_loopback;
pub use playback::{play_file, IvfSource};
