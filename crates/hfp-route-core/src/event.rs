//! Events processed by the route state machine.
//!
//! Routing requests come from call control, device and audio events come
//! from the Bluetooth stack, and timer events are scheduled by the machine
//! itself and delivered back through the same queue.

use serde::{Deserialize, Serialize};

/// An input to the route state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RouteEvent {
    /// Route call audio to Bluetooth; `None` lets the machine pick a device
    ConnectHfp { device: Option<String> },
    /// Move call audio off Bluetooth
    DisconnectHfp,
    /// A hands-free device connected
    DeviceAdded { address: String },
    /// A hands-free device disconnected
    DeviceLost { address: String },
    /// Native stack confirmed audio on a device
    HfpAudioOn { address: String },
    /// Native stack dropped audio on a device that is still connected
    HfpAudioLost { address: String },
    /// A pending connection was not confirmed in time
    ConnectionTimeout { generation: u64 },
    /// Backoff before reissuing a rejected or timed out connection elapsed
    RetryConnect { generation: u64 },
}

impl RouteEvent {
    /// Short event name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectHfp { .. } => "connect_hfp",
            Self::DisconnectHfp => "disconnect_hfp",
            Self::DeviceAdded { .. } => "device_added",
            Self::DeviceLost { .. } => "device_lost",
            Self::HfpAudioOn { .. } => "hfp_audio_on",
            Self::HfpAudioLost { .. } => "hfp_audio_lost",
            Self::ConnectionTimeout { .. } => "connection_timeout",
            Self::RetryConnect { .. } => "retry_connect",
        }
    }

    /// Whether the event was scheduled by the machine rather than a caller.
    #[must_use]
    pub fn is_timer(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. } | Self::RetryConnect { .. })
    }
}
