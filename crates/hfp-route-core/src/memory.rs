//! In-memory collaborators for hosts without a Bluetooth stack.
//!
//! Both types are cheap handles over shared state: clone one, hand the
//! clone to the state machine, and keep driving your own handle.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::collaborators::{DeviceDirectory, HeadsetCommandSink};
use crate::device::Device;
use crate::transition::HeadsetCommand;

/// Connected devices ordered by recency, most recent first.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    devices: Arc<Mutex<Vec<Device>>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `addresses`, most recent first.
    #[must_use]
    pub fn with(addresses: &[&str]) -> Self {
        let directory = Self::new();
        directory.replace(addresses);
        directory
    }

    /// Record a newly connected device as the most recent one.
    pub fn connect(&self, address: &str) {
        let mut devices = self.devices.lock();
        devices.retain(|d| !d.has_address(address));
        devices.insert(0, Device::new(address));
    }

    /// Forget a device.
    pub fn disconnect(&self, address: &str) {
        self.devices.lock().retain(|d| !d.has_address(address));
    }

    /// Replace the whole connected set, most recent first.
    pub fn replace(&self, addresses: &[&str]) {
        *self.devices.lock() = addresses.iter().map(|a| Device::new(*a)).collect();
    }
}

impl DeviceDirectory for MemoryDirectory {
    fn connected_device_count(&self) -> usize {
        self.devices.lock().len()
    }

    fn connected_devices(&self) -> Vec<Device> {
        self.devices.lock().clone()
    }

    fn most_recently_connected_excluding(&self, excluded: Option<&str>) -> Option<Device> {
        self.devices
            .lock()
            .iter()
            .find(|d| excluded.is_none_or(|address| !d.has_address(address)))
            .cloned()
    }
}

#[derive(Debug)]
struct HeadsetInner {
    accept_connect: bool,
    active: HashSet<String>,
    commands: Vec<HeadsetCommand>,
}

/// Headset interface that records commands instead of touching hardware.
///
/// Its connected set mirrors the [`MemoryDirectory`] it was built from.
#[derive(Debug, Clone)]
pub struct RecordingHeadset {
    directory: MemoryDirectory,
    inner: Arc<Mutex<HeadsetInner>>,
}

impl RecordingHeadset {
    #[must_use]
    pub fn new(directory: MemoryDirectory) -> Self {
        Self {
            directory,
            inner: Arc::new(Mutex::new(HeadsetInner {
                accept_connect: true,
                active: HashSet::new(),
                commands: Vec::new(),
            })),
        }
    }

    /// Whether subsequent connect requests are accepted.
    pub fn set_accept_connect(&self, accept: bool) {
        self.inner.lock().accept_connect = accept;
    }

    /// Mark the devices on which the native stack reports active audio.
    pub fn set_active(&self, addresses: &[&str]) {
        self.inner.lock().active = addresses.iter().map(|a| (*a).to_string()).collect();
    }

    /// Commands issued so far.
    #[must_use]
    pub fn commands(&self) -> Vec<HeadsetCommand> {
        self.inner.lock().commands.clone()
    }

    /// Drain the recorded commands.
    pub fn take_commands(&self) -> Vec<HeadsetCommand> {
        std::mem::take(&mut self.inner.lock().commands)
    }
}

impl HeadsetCommandSink for RecordingHeadset {
    fn connect_audio(&self, address: &str) -> bool {
        let mut inner = self.inner.lock();
        inner.commands.push(HeadsetCommand::ConnectAudio { address: address.to_string() });
        inner.accept_connect
    }

    fn disconnect_audio(&self) {
        self.inner.lock().commands.push(HeadsetCommand::DisconnectAudio);
    }

    fn is_audio_active_on(&self, device: &Device) -> bool {
        self.inner.lock().active.contains(device.address())
    }

    fn connected_devices(&self) -> Vec<Device> {
        self.directory.connected_devices()
    }
}
