//! Outcome of processing one event.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::RouteError;
use crate::event::RouteEvent;
use crate::listener::ListenerUpdate;
use crate::state::RouteState;

/// A command issued to the headset interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum HeadsetCommand {
    ConnectAudio { address: String },
    DisconnectAudio,
}

/// What the owner of the machine should do with the timer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum TimerAction {
    /// Leave any outstanding timer alone
    #[default]
    Keep,
    /// Drop the outstanding timer
    Cancel,
    /// Replace any outstanding timer with a new one
    Arm(TimerRequest),
}

/// Which timer event to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    ConnectionTimeout,
    RetryConnect,
}

/// A timer to arm, tagged with the generation that must match on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerRequest {
    pub kind: TimerKind,
    pub generation: u64,
    #[serde(with = "millis")]
    pub delay: Duration,
}

impl TimerRequest {
    /// The event to deliver when the timer fires.
    #[must_use]
    pub fn event(&self) -> RouteEvent {
        match self.kind {
            TimerKind::ConnectionTimeout => RouteEvent::ConnectionTimeout { generation: self.generation },
            TimerKind::RetryConnect => RouteEvent::RetryConnect { generation: self.generation },
        }
    }
}

/// Record of a processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Name of the processed event
    pub event: &'static str,
    pub from: RouteState,
    pub to: RouteState,
    /// Command issued to the headset interface, if any
    pub command: Option<HeadsetCommand>,
    /// Notifications delivered, in order
    pub updates: Vec<ListenerUpdate>,
    pub timer: TimerAction,
    /// First fault observed while processing, if any
    #[serde(serialize_with = "fault_message")]
    pub fault: Option<RouteError>,
}

impl Transition {
    pub(crate) fn new(event: &'static str, from: RouteState) -> Self {
        Self {
            event,
            to: from.clone(),
            from,
            command: None,
            updates: Vec::new(),
            timer: TimerAction::Keep,
            fault: None,
        }
    }

    /// Attach `err` unless an earlier fault was already recorded for this event.
    pub(crate) fn record_fault(&mut self, err: RouteError) {
        match &self.fault {
            Some(first) => {
                debug!(address = err.address(), error = %err, first = %first, "Keeping first fault");
            }
            None => self.fault = Some(err),
        }
    }

    /// Whether the route state changed.
    #[must_use]
    pub fn changed_state(&self) -> bool {
        self.from != self.to
    }
}

fn fault_message<S: serde::Serializer>(
    fault: &Option<RouteError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match fault {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

mod millis {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(
        delay: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }
}
