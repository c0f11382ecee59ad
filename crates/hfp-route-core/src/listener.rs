//! Listener notifications and their dispatch.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Lock shared with the call-control layer.
///
/// Held while listener callbacks run, since those callbacks cross into call
/// control. The route state itself is never guarded by it.
pub type CallLock = Arc<Mutex<()>>;

/// Observer of device availability and audio route changes.
#[cfg_attr(test, automock)]
pub trait RouteListener: Send {
    fn on_device_list_changed(&self);
    fn on_device_available(&self);
    fn on_device_unavailable(&self);
    fn on_audio_connected(&self);
    fn on_audio_disconnected(&self);
}

/// A single notification produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerUpdate {
    DeviceListChanged,
    DeviceAvailable,
    DeviceUnavailable,
    AudioConnected,
    AudioDisconnected,
}

impl ListenerUpdate {
    /// Deliver this update to `listener`.
    pub fn deliver(self, listener: &dyn RouteListener) {
        match self {
            Self::DeviceListChanged => listener.on_device_list_changed(),
            Self::DeviceAvailable => listener.on_device_available(),
            Self::DeviceUnavailable => listener.on_device_unavailable(),
            Self::AudioConnected => listener.on_audio_connected(),
            Self::AudioDisconnected => listener.on_audio_disconnected(),
        }
    }
}

/// Delivers transition notifications to the registered listener.
pub struct Notifier {
    listener: Option<Box<dyn RouteListener>>,
    call_lock: CallLock,
}

impl Notifier {
    #[must_use]
    pub fn new(call_lock: CallLock) -> Self {
        Self { listener: None, call_lock }
    }

    /// Replace the registered listener.
    pub fn set_listener(&mut self, listener: Box<dyn RouteListener>) {
        self.listener = Some(listener);
    }

    /// Deliver `updates` in order while holding the call lock.
    pub fn dispatch(&self, updates: &[ListenerUpdate]) {
        let Some(listener) = self.listener.as_deref() else {
            return;
        };
        if updates.is_empty() {
            return;
        }

        let _guard = self.call_lock.lock();
        for update in updates {
            trace!(?update, "Notifying listener");
            update.deliver(listener);
        }
    }
}
