//! Target and fallback device selection.
//!
//! Recency ordering is owned by the device directory; these helpers only
//! consume it and guarantee a selected device is currently connected.

use tracing::{debug, warn};

use crate::collaborators::{DeviceDirectory, HeadsetCommandSink};
use crate::device::Device;
use crate::error::{Result, RouteError};

/// Resolve the device a connect request should target.
///
/// A named device must be connected. Without a name, the most recently
/// connected device is picked. `Ok(None)` means no device is available.
///
/// # Errors
/// Returns [`RouteError::UnknownDevice`] if a named device is not connected.
pub fn select_target(
    directory: &dyn DeviceDirectory,
    requested: Option<&str>,
) -> Result<Option<Device>> {
    match requested {
        Some(address) if directory.contains(address) => Ok(Some(Device::new(address))),
        Some(address) => {
            warn!(address, "Connect requested for a device that is not connected");
            Err(RouteError::UnknownDevice { address: address.to_string() })
        }
        None => Ok(directory
            .most_recently_connected_excluding(None)
            .filter(|candidate| directory.contains(candidate.address()))),
    }
}

/// Pick the device to take over audio from `vacated`.
#[must_use]
pub fn fallback_candidate(directory: &dyn DeviceDirectory, vacated: &str) -> Option<Device> {
    let candidate = directory
        .most_recently_connected_excluding(Some(vacated))
        .filter(|c| !c.has_address(vacated) && directory.contains(c.address()));
    debug!(vacated, candidate = ?candidate.as_ref().map(Device::address), "Fallback candidate");
    candidate
}

/// Find a connected device on which the native stack reports active audio.
#[must_use]
pub fn find_active_device(sink: &dyn HeadsetCommandSink) -> Option<Device> {
    sink.connected_devices().into_iter().find(|device| sink.is_audio_active_on(device))
}
