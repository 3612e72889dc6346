//! Session state and description exchange

pub mod context;
pub mod monitor;
pub mod negotiation;

pub use context::SessionContext;
pub use monitor::install_state_monitor;
