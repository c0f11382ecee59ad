//! Error types for HFP routing.

use thiserror::Error;

/// Faults observed while routing call audio.
///
/// None of these are fatal: the state machine always resolves them to a
/// valid route state and reports them on the resulting transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Headset rejected audio connection to {address}")]
    CommandRejected { address: String },

    #[error("Audio on {address} was not confirmed in time")]
    ConfirmationTimeout { address: String },

    #[error("Native stack reported audio for {address}, which is not in the device directory")]
    InconsistentDeviceReport { address: String },

    #[error("Device not connected: {address}")]
    UnknownDevice { address: String },
}

impl RouteError {
    /// Address of the device the fault refers to.
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::CommandRejected { address }
            | Self::ConfirmationTimeout { address }
            | Self::InconsistentDeviceReport { address }
            | Self::UnknownDevice { address } => address,
        }
    }
}

/// Result type alias for HFP routing operations.
pub type Result<T> = std::result::Result<T, RouteError>;
