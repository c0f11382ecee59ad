//! Connection timing parameters.

use std::time::Duration;

/// Default time to wait for the stack to confirm audio.
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default delay before reissuing a failed connection.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);
/// Upper bound on reissued connections per request.
pub const MAX_CONNECT_RETRIES: u32 = 1;

/// Timing parameters supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// How long `AudioConnecting` waits for confirmation
    pub pending: Duration,
    /// Delay before a connection is reissued
    pub retry_backoff: Duration,
    /// Reissued connections allowed after a failed attempt
    pub max_connect_retries: u32,
}

impl Timeouts {
    /// Create timeouts, clamping the retry count to [`MAX_CONNECT_RETRIES`].
    #[must_use]
    pub fn new(pending: Duration, retry_backoff: Duration, max_connect_retries: u32) -> Self {
        Self {
            pending,
            retry_backoff,
            max_connect_retries: max_connect_retries.min(MAX_CONNECT_RETRIES),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TIMEOUT, DEFAULT_RETRY_BACKOFF, 0)
    }
}
