//! Bluetooth hands-free device identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A connected hands-free device, identified by its Bluetooth address.
///
/// Two devices are the same device exactly when their addresses match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Device {
    address: String,
}

impl Device {
    /// Create a device from its address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into() }
    }

    /// The device's Bluetooth address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Check whether this device has the given address.
    #[must_use]
    pub fn has_address(&self, address: &str) -> bool {
        self.address == address
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl From<&str> for Device {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Device {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}
