//! Runtime error types.

use hfp_route_core::RouteError;
use thiserror::Error;

/// Errors from driving the route state machine.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Route event queue closed")]
    QueueClosed,

    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    #[error("Route task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
