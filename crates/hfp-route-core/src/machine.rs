//! The audio route state machine.
//!
//! The machine is synchronous and owns its route state outright. Every
//! input goes through [`RouteStateMachine::process`], which issues at most
//! one headset command, delivers the resulting notifications, and returns a
//! [`Transition`] describing what happened. Timers are requested through the
//! transition and come back as tagged events; a timer whose generation no
//! longer matches the armed one is discarded.

use tracing::{debug, info, trace, warn};

use crate::collaborators::{DeviceDirectory, HeadsetCommandSink};
use crate::device::Device;
use crate::error::{Result, RouteError};
use crate::event::RouteEvent;
use crate::listener::{CallLock, ListenerUpdate, Notifier, RouteListener};
use crate::selection::{fallback_candidate, find_active_device, select_target};
use crate::state::RouteState;
use crate::timeouts::Timeouts;
use crate::transition::{HeadsetCommand, TimerAction, TimerKind, TimerRequest, Transition};

/// The single outstanding timer.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingTimer {
    generation: u64,
    kind: TimerKind,
    device: Device,
    /// Retries already spent on this request
    attempt: u32,
}

/// Decides which hands-free device carries call audio.
pub struct RouteStateMachine {
    state: RouteState,
    directory: Box<dyn DeviceDirectory>,
    headset: Box<dyn HeadsetCommandSink>,
    notifier: Notifier,
    timeouts: Timeouts,
    pending: Option<PendingTimer>,
    generation: u64,
}

impl RouteStateMachine {
    /// Create a machine in [`RouteState::AudioOff`].
    #[must_use]
    pub fn new(
        directory: Box<dyn DeviceDirectory>,
        headset: Box<dyn HeadsetCommandSink>,
        timeouts: Timeouts,
        call_lock: CallLock,
    ) -> Self {
        Self {
            state: RouteState::AudioOff,
            directory,
            headset,
            notifier: Notifier::new(call_lock),
            timeouts,
            pending: None,
            generation: 0,
        }
    }

    /// Register the listener that receives route notifications.
    pub fn set_listener(&mut self, listener: Box<dyn RouteListener>) {
        self.notifier.set_listener(listener);
    }

    #[must_use]
    pub fn state(&self) -> &RouteState {
        &self.state
    }

    /// Diagnostic name of the current state.
    #[must_use]
    pub fn current_state_name(&self) -> String {
        self.state.name().to_string()
    }

    /// Force the machine into `state` without issuing commands or
    /// notifications. Entering `AudioConnecting` arms a connection timeout,
    /// which is returned so the caller can schedule it.
    ///
    /// # Errors
    /// Returns [`RouteError::UnknownDevice`] if the state names a device
    /// that is not connected.
    pub fn set_initial_state(&mut self, state: RouteState) -> Result<Option<TimerRequest>> {
        if let Some(device) = state.device() {
            if !self.directory.contains(device.address()) {
                return Err(RouteError::UnknownDevice { address: device.address().to_string() });
            }
        }

        let mut tx = Transition::new("set_initial_state", self.state.clone());
        self.pending = None;
        self.state = state;
        if let RouteState::AudioConnecting(device) = &self.state {
            let device = device.clone();
            self.arm_timer(TimerKind::ConnectionTimeout, device, 0, &mut tx);
        }
        info!(state = %self.state, "Route state initialized");

        Ok(match tx.timer {
            TimerAction::Arm(request) => Some(request),
            TimerAction::Keep | TimerAction::Cancel => None,
        })
    }

    /// Process one event to completion.
    pub fn process(&mut self, event: RouteEvent) -> Transition {
        let mut tx = Transition::new(event.name(), self.state.clone());
        let scheduled = event.is_timer();

        match event {
            RouteEvent::ConnectHfp { device } => self.on_connect_hfp(device.as_deref(), &mut tx),
            RouteEvent::DisconnectHfp => self.on_disconnect_hfp(&mut tx),
            RouteEvent::DeviceAdded { address } => self.on_device_added(&address, &mut tx),
            RouteEvent::DeviceLost { address } => self.on_device_lost(&address, &mut tx),
            RouteEvent::HfpAudioOn { address } => self.on_hfp_audio_on(&address, &mut tx),
            RouteEvent::HfpAudioLost { address } => self.on_hfp_audio_lost(&address, &mut tx),
            RouteEvent::ConnectionTimeout { generation } => {
                self.on_connection_timeout(generation, &mut tx);
            }
            RouteEvent::RetryConnect { generation } => self.on_retry_connect(generation, &mut tx),
        }

        tx.to = self.state.clone();
        self.notifier.dispatch(&tx.updates);

        if tx.changed_state() {
            info!(event = tx.event, from = %tx.from, to = %tx.to, "Route state changed");
        } else if scheduled && tx.command.is_none() {
            trace!(event = tx.event, state = %tx.to, "Timer had no effect");
        } else {
            debug!(event = tx.event, state = %tx.to, updates = tx.updates.len(), "Event processed");
        }
        tx
    }

    fn on_connect_hfp(&mut self, requested: Option<&str>, tx: &mut Transition) {
        let Some(current) = self.state.device().cloned() else {
            self.cancel_timer(tx);
            match select_target(self.directory.as_ref(), requested) {
                Ok(Some(target)) => self.begin_connect(target, 0, tx),
                Ok(None) => {
                    info!("No hands-free device available for audio");
                    tx.updates.push(ListenerUpdate::AudioDisconnected);
                }
                Err(err) => {
                    tx.record_fault(err);
                    tx.updates.push(ListenerUpdate::AudioDisconnected);
                }
            }
            return;
        };

        let Some(address) = requested else {
            debug!(device = %current, "Audio already routed to Bluetooth");
            return;
        };
        if current.has_address(address) {
            debug!(device = %current, "Audio already routed to requested device");
            return;
        }

        match select_target(self.directory.as_ref(), Some(address)) {
            Ok(Some(target)) => {
                info!(from = %current, to = %target, "Switching hands-free audio device");
                self.begin_connect(target, 0, tx);
            }
            Ok(None) => {}
            Err(err) => tx.record_fault(err),
        }
    }

    fn on_disconnect_hfp(&mut self, tx: &mut Transition) {
        self.cancel_timer(tx);
        if self.state.is_off() {
            debug!("Audio already off");
            return;
        }

        self.headset.disconnect_audio();
        tx.command = Some(HeadsetCommand::DisconnectAudio);
        self.state = RouteState::AudioOff;
        tx.updates.push(ListenerUpdate::AudioDisconnected);
    }

    fn on_device_added(&mut self, address: &str, tx: &mut Transition) {
        let count = self.directory.connected_device_count();
        debug!(address, count, "Hands-free device added");

        tx.updates.push(ListenerUpdate::DeviceListChanged);
        if count == 1 {
            tx.updates.push(ListenerUpdate::DeviceAvailable);
        }
    }

    fn on_device_lost(&mut self, address: &str, tx: &mut Transition) {
        if self.state.is_routed_to(address) {
            info!(address, "Audio device disconnected");
            self.fallback(address, tx);
        } else if self.pending.as_ref().is_some_and(|p| p.device.has_address(address)) {
            debug!(address, "Dropping retry for disconnected device");
            self.cancel_timer(tx);
        }

        let count = self.directory.connected_device_count();
        debug!(address, count, "Hands-free device lost");
        tx.updates.push(ListenerUpdate::DeviceListChanged);
        if count == 0 {
            tx.updates.push(ListenerUpdate::DeviceUnavailable);
        }
    }

    fn on_hfp_audio_on(&mut self, address: &str, tx: &mut Transition) {
        self.check_reported_device(address, tx);

        if matches!(&self.state, RouteState::AudioConnected(d) if d.has_address(address)) {
            debug!(address, "Duplicate audio confirmation");
            return;
        }

        self.cancel_timer(tx);
        self.state = RouteState::AudioConnected(Device::new(address));
        tx.updates.push(ListenerUpdate::AudioConnected);
    }

    fn on_hfp_audio_lost(&mut self, address: &str, tx: &mut Transition) {
        self.check_reported_device(address, tx);

        if self.state.is_routed_to(address) {
            info!(address, "Hands-free audio dropped");
            self.fallback(address, tx);
        } else {
            debug!(address, state = %self.state, "Ignoring audio loss on untracked device");
        }
    }

    fn on_connection_timeout(&mut self, generation: u64, tx: &mut Transition) {
        let pending = match self.pending.take() {
            Some(p)
                if p.generation == generation
                    && p.kind == TimerKind::ConnectionTimeout
                    && matches!(&self.state, RouteState::AudioConnecting(d) if *d == p.device) =>
            {
                p
            }
            other => {
                self.pending = other;
                debug!(generation, "Discarding stale connection timeout");
                return;
            }
        };

        let err = RouteError::ConfirmationTimeout { address: pending.device.address().to_string() };
        warn!(address = err.address(), error = %err, "Connection attempt failed");
        tx.record_fault(err);
        self.resolve_failed_attempt(pending.device, pending.attempt, tx);
    }

    fn on_retry_connect(&mut self, generation: u64, tx: &mut Transition) {
        let pending = match self.pending.take() {
            Some(p)
                if p.generation == generation
                    && p.kind == TimerKind::RetryConnect
                    && self.state.is_off() =>
            {
                p
            }
            other => {
                self.pending = other;
                debug!(generation, "Discarding stale connection retry");
                return;
            }
        };

        if !self.directory.contains(pending.device.address()) {
            debug!(device = %pending.device, "Retry target no longer connected");
            return;
        }

        info!(device = %pending.device, attempt = pending.attempt, "Retrying audio connection");
        self.begin_connect(pending.device, pending.attempt, tx);
    }

    /// Move audio away from `vacated`, or turn it off if no device is left.
    fn fallback(&mut self, vacated: &str, tx: &mut Transition) {
        self.cancel_timer(tx);
        if let Some(candidate) = fallback_candidate(self.directory.as_ref(), vacated) {
            info!(from = vacated, to = %candidate, "Falling back to another device");
            self.begin_connect(candidate, 0, tx);
        } else {
            self.state = RouteState::AudioOff;
            tx.updates.push(ListenerUpdate::AudioDisconnected);
        }
    }

    fn begin_connect(&mut self, target: Device, attempt: u32, tx: &mut Transition) {
        self.cancel_timer(tx);
        tx.command = Some(HeadsetCommand::ConnectAudio { address: target.address().to_string() });

        if self.headset.connect_audio(target.address()) {
            self.state = RouteState::AudioConnecting(target.clone());
            self.arm_timer(TimerKind::ConnectionTimeout, target, attempt, tx);
            tx.updates.push(ListenerUpdate::AudioConnected);
        } else {
            let err = RouteError::CommandRejected { address: target.address().to_string() };
            warn!(address = err.address(), error = %err, "Connection attempt failed");
            tx.record_fault(err);
            self.resolve_failed_attempt(target, attempt, tx);
        }
    }

    /// Settle on whatever the native stack reports after a failed attempt.
    fn resolve_failed_attempt(&mut self, attempted: Device, attempt: u32, tx: &mut Transition) {
        if let Some(active) = find_active_device(self.headset.as_ref()) {
            info!(device = %active, "Audio already active on another device");
            self.state = RouteState::AudioConnected(active);
            tx.updates.push(ListenerUpdate::AudioConnected);
            return;
        }

        self.state = RouteState::AudioOff;
        tx.updates.push(ListenerUpdate::AudioDisconnected);

        if attempt < self.timeouts.max_connect_retries
            && self.directory.contains(attempted.address())
        {
            self.arm_timer(TimerKind::RetryConnect, attempted, attempt + 1, tx);
        }
    }

    fn check_reported_device(&self, address: &str, tx: &mut Transition) {
        if !self.directory.contains(address) {
            let err = RouteError::InconsistentDeviceReport { address: address.to_string() };
            warn!(address = err.address(), error = %err, "Device directory may be stale");
            tx.record_fault(err);
        }
    }

    fn arm_timer(&mut self, kind: TimerKind, device: Device, attempt: u32, tx: &mut Transition) {
        self.generation += 1;
        let delay = match kind {
            TimerKind::ConnectionTimeout => self.timeouts.pending,
            TimerKind::RetryConnect => self.timeouts.retry_backoff,
        };
        debug!(?kind, generation = self.generation, ?delay, device = %device, "Arming timer");

        self.pending = Some(PendingTimer { generation: self.generation, kind, device, attempt });
        tx.timer = TimerAction::Arm(TimerRequest { kind, generation: self.generation, delay });
    }

    fn cancel_timer(&mut self, tx: &mut Transition) {
        if let Some(pending) = self.pending.take() {
            debug!(generation = pending.generation, kind = ?pending.kind, "Cancelling timer");
            tx.timer = TimerAction::Cancel;
        }
    }
}
