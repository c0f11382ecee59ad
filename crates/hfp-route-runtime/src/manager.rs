//! Serialized event loop around the route state machine.
//!
//! Callers on any thread enqueue events through a [`RouteHandle`]. A single
//! tokio task drains the queue in arrival order, so the route state is only
//! ever touched from that task. Connection timers are tasks that sleep and
//! then enqueue their tagged event like any other caller.

use std::sync::Arc;

use arc_swap::ArcSwap;
use hfp_route_core::{
    RouteEvent, RouteState, RouteStateMachine, TimerAction, TimerRequest, Transition,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};

/// Capacity of the transition broadcast channel.
const TRANSITION_CHANNEL_CAPACITY: usize = 256;

enum Message {
    Event(RouteEvent),
    SetInitialState(RouteState, oneshot::Sender<RuntimeResult<()>>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Cloneable handle for enqueueing events.
#[derive(Clone)]
pub struct RouteHandle {
    tx: mpsc::UnboundedSender<Message>,
    state: Arc<ArcSwap<RouteState>>,
}

impl RouteHandle {
    /// Request call audio on Bluetooth, optionally on a specific device.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn connect(&self, device: Option<&str>) -> RuntimeResult<()> {
        self.send(RouteEvent::ConnectHfp { device: device.map(str::to_string) })
    }

    /// Request call audio off Bluetooth.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn disconnect(&self) -> RuntimeResult<()> {
        self.send(RouteEvent::DisconnectHfp)
    }

    /// Report a newly connected device.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn device_added(&self, address: &str) -> RuntimeResult<()> {
        self.send(RouteEvent::DeviceAdded { address: address.to_string() })
    }

    /// Report a disconnected device.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn device_lost(&self, address: &str) -> RuntimeResult<()> {
        self.send(RouteEvent::DeviceLost { address: address.to_string() })
    }

    /// Report that the native stack confirmed audio on a device.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn hfp_audio_on(&self, address: &str) -> RuntimeResult<()> {
        self.send(RouteEvent::HfpAudioOn { address: address.to_string() })
    }

    /// Report that the native stack dropped audio on a device.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn hfp_audio_lost(&self, address: &str) -> RuntimeResult<()> {
        self.send(RouteEvent::HfpAudioLost { address: address.to_string() })
    }

    /// Enqueue an arbitrary event.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub fn send(&self, event: RouteEvent) -> RuntimeResult<()> {
        self.tx.send(Message::Event(event)).map_err(|_| RuntimeError::QueueClosed)
    }

    /// Force the route state, arming a connection timer if needed.
    ///
    /// # Errors
    /// Returns an error if the state names a device that is not connected,
    /// or if the route task has stopped.
    pub async fn set_initial_state(&self, state: RouteState) -> RuntimeResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Message::SetInitialState(state, reply_tx))
            .map_err(|_| RuntimeError::QueueClosed)?;
        reply_rx.await.map_err(|_| RuntimeError::QueueClosed)?
    }

    /// Wait until every event enqueued before this call has been processed.
    ///
    /// # Errors
    /// Returns an error if the route task has stopped.
    pub async fn flush(&self) -> RuntimeResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(Message::Flush(reply_tx)).map_err(|_| RuntimeError::QueueClosed)?;
        reply_rx.await.map_err(|_| RuntimeError::QueueClosed)
    }

    /// State after the most recently processed event.
    #[must_use]
    pub fn current_state(&self) -> Arc<RouteState> {
        self.state.load_full()
    }

    /// Diagnostic name of the current state.
    #[must_use]
    pub fn current_state_name(&self) -> String {
        self.state.load().name().to_string()
    }
}

/// Owner of the route task.
pub struct RouteManager {
    handle: RouteHandle,
    transitions: broadcast::Sender<Transition>,
    task: JoinHandle<()>,
}

impl RouteManager {
    /// Spawn the route task on the current tokio runtime.
    #[must_use]
    pub fn spawn(machine: RouteStateMachine) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        let state = Arc::new(ArcSwap::from_pointee(machine.state().clone()));

        let worker = Worker {
            machine,
            rx,
            timer_tx: tx.downgrade(),
            state: Arc::clone(&state),
            transitions: transitions.clone(),
            timer: None,
        };
        let task = tokio::spawn(worker.run());

        Self { handle: RouteHandle { tx, state }, transitions, task }
    }

    /// A handle for enqueueing events.
    #[must_use]
    pub fn handle(&self) -> RouteHandle {
        self.handle.clone()
    }

    /// Receive a record of every transition processed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    /// Stop the route task after it drains already-enqueued events.
    ///
    /// # Errors
    /// Returns an error if the task panicked.
    pub async fn shutdown(self) -> RuntimeResult<()> {
        // The task may already be gone; joining it reports why.
        let _ = self.handle.tx.send(Message::Shutdown);
        self.task.await?;
        Ok(())
    }
}

struct Worker {
    machine: RouteStateMachine,
    rx: mpsc::UnboundedReceiver<Message>,
    timer_tx: mpsc::WeakUnboundedSender<Message>,
    state: Arc<ArcSwap<RouteState>>,
    transitions: broadcast::Sender<Transition>,
    timer: Option<JoinHandle<()>>,
}

impl Worker {
    async fn run(mut self) {
        info!(state = %self.machine.state(), "Route manager started");

        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Event(event) => self.handle_event(event),
                Message::SetInitialState(state, reply) => {
                    let result = self.machine.set_initial_state(state).map_err(RuntimeError::from);
                    if let Ok(timer) = &result {
                        self.cancel_timer();
                        if let Some(request) = timer {
                            self.arm_timer(*request);
                        }
                        self.publish_state();
                    }
                    let _ = reply.send(result.map(|_| ()));
                }
                Message::Flush(reply) => {
                    let _ = reply.send(());
                }
                Message::Shutdown => break,
            }
        }

        self.cancel_timer();
        info!("Route manager stopped");
    }

    fn handle_event(&mut self, event: RouteEvent) {
        let transition = self.machine.process(event);

        match &transition.timer {
            TimerAction::Keep => {}
            TimerAction::Cancel => self.cancel_timer(),
            TimerAction::Arm(request) => {
                self.cancel_timer();
                self.arm_timer(*request);
            }
        }

        self.publish_state();
        // No subscribers is fine.
        let _ = self.transitions.send(transition);
    }

    fn publish_state(&self) {
        self.state.store(Arc::new(self.machine.state().clone()));
    }

    fn arm_timer(&mut self, request: TimerRequest) {
        let timer_tx = self.timer_tx.clone();
        self.timer = Some(tokio::spawn(async move {
            sleep(request.delay).await;
            if let Some(tx) = timer_tx.upgrade() {
                debug!(generation = request.generation, kind = ?request.kind, "Timer fired");
                let _ = tx.send(Message::Event(request.event()));
            }
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
