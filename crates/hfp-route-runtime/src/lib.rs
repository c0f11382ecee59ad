//! HFP route runtime.
//!
//! Drives the route state machine from a single tokio task, owns the
//! connection timers, and loads configuration and logging for the
//! `hfp-route-replay` tool.

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod replay;

pub use config::Config;
pub use error::{RuntimeError, RuntimeResult};
pub use manager::{RouteHandle, RouteManager};
