//! Contracts for the components the route state machine talks to.
//!
//! The device directory and the native headset interface are owned by the
//! Bluetooth stack. This crate only reads from the former and issues
//! commands to the latter.

#[cfg(test)]
use mockall::automock;

use crate::device::Device;

/// Live view of the connected hands-free devices.
pub trait DeviceDirectory: Send {
    /// Number of connected devices.
    fn connected_device_count(&self) -> usize;

    /// Connected devices, most recently connected first.
    fn connected_devices(&self) -> Vec<Device>;

    /// The most recently connected device whose address is not `excluded`.
    fn most_recently_connected_excluding(&self, excluded: Option<&str>) -> Option<Device>;

    /// Check whether a device with `address` is connected.
    fn contains(&self, address: &str) -> bool {
        self.connected_devices().iter().any(|d| d.has_address(address))
    }
}

/// Command surface of the native headset interface.
#[cfg_attr(test, automock)]
pub trait HeadsetCommandSink: Send {
    /// Ask the stack to open SCO audio to `address`.
    ///
    /// Returns whether the request was accepted, not whether audio is up.
    fn connect_audio(&self, address: &str) -> bool;

    /// Ask the stack to close SCO audio.
    fn disconnect_audio(&self);

    /// Whether the stack reports audio active on `device`.
    fn is_audio_active_on(&self, device: &Device) -> bool;

    /// Devices the headset interface considers connected.
    fn connected_devices(&self) -> Vec<Device>;
}
