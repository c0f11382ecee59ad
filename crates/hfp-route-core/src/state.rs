//! Route state and its diagnostic name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::Device;

/// Which device, if any, owns call audio.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "device")]
pub enum RouteState {
    /// No device owns audio
    #[default]
    AudioOff,
    /// A connect command was issued and confirmation is pending
    AudioConnecting(Device),
    /// The native stack confirmed audio on the device
    AudioConnected(Device),
}

impl RouteState {
    /// The device that owns or is acquiring audio.
    #[must_use]
    pub fn device(&self) -> Option<&Device> {
        match self {
            Self::AudioOff => None,
            Self::AudioConnecting(device) | Self::AudioConnected(device) => Some(device),
        }
    }

    /// Check whether `address` owns or is acquiring audio.
    #[must_use]
    pub fn is_routed_to(&self, address: &str) -> bool {
        self.device().is_some_and(|d| d.has_address(address))
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        matches!(self, Self::AudioOff)
    }

    /// Diagnostic name, e.g. `AudioConnecting:00:11:22:33:44:55`.
    #[must_use]
    pub fn name(&self) -> StateName<'_> {
        StateName(self)
    }
}

/// Formatter for the diagnostic name of a [`RouteState`].
#[derive(Debug, Clone, Copy)]
pub struct StateName<'a>(&'a RouteState);

impl StateName<'_> {
    pub const AUDIO_OFF: &'static str = "AudioOff";
    pub const AUDIO_CONNECTING: &'static str = "AudioConnecting";
    pub const AUDIO_CONNECTED: &'static str = "AudioConnected";
}

impl fmt::Display for StateName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            RouteState::AudioOff => f.write_str(Self::AUDIO_OFF),
            RouteState::AudioConnecting(device) => {
                write!(f, "{}:{device}", Self::AUDIO_CONNECTING)
            }
            RouteState::AudioConnected(device) => write!(f, "{}:{device}", Self::AUDIO_CONNECTED),
        }
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}
