//! HFP Route Core - Decides which hands-free device carries call audio.
//!
//! This crate contains the audio route state machine together with the
//! contracts it uses to talk to the Bluetooth stack. It is synchronous; the
//! runtime crate drives it from a single serialized event queue.

pub mod collaborators;
pub mod device;
pub mod error;
pub mod event;
pub mod listener;
pub mod machine;
pub mod memory;
pub mod selection;
pub mod state;
pub mod timeouts;
pub mod transition;

pub use collaborators::{DeviceDirectory, HeadsetCommandSink};
pub use device::Device;
pub use error::{Result, RouteError};
pub use event::RouteEvent;
pub use listener::{CallLock, ListenerUpdate, RouteListener};
pub use machine::RouteStateMachine;
pub use memory::{MemoryDirectory, RecordingHeadset};
pub use state::RouteState;
pub use timeouts::Timeouts;
pub use transition::{HeadsetCommand, TimerAction, TimerKind, TimerRequest, Transition};
