//! Scripted replay of routing sequences against in-memory collaborators.
//!
//! A script sets up the connected devices and initial state, then runs
//! steps that mutate the simulated Bluetooth stack or send events. Device
//! added/lost events update the simulated directory before they are sent,
//! the same order the real stack reports them in.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use hfp_route_core::{
    CallLock, MemoryDirectory, RecordingHeadset, RouteEvent, RouteState, RouteStateMachine,
    Timeouts, Transition,
};
use serde::Deserialize;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::sleep;
use tracing::debug;

use crate::manager::RouteManager;

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Connected devices before the first step, most recent first
    #[serde(default)]
    pub connected: Vec<String>,
    /// State to start in
    #[serde(default)]
    pub initial_state: RouteState,
    /// Steps, run in order
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// One step of a replay script.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum Step {
    /// Replace the connected devices, most recent first
    SetConnected { devices: Vec<String> },
    /// Set the devices the native stack reports audio active on
    SetAudioActive { devices: Vec<String> },
    /// Make the headset accept or reject connect requests
    SetAcceptConnect { accept: bool },
    /// Send an event to the state machine
    Send { event: RouteEvent },
    /// Let time pass so armed timers can fire
    Wait { ms: u64 },
}

/// Parse a script from TOML.
pub fn parse_script(text: &str) -> Result<Script> {
    toml::from_str(text).context("Failed to parse replay script")
}

/// Load a script from a TOML file.
pub fn load_script(path: &Path) -> Result<Script> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay script: {path:?}"))?;
    parse_script(&text)
}

fn as_strs(addresses: &[String]) -> Vec<&str> {
    addresses.iter().map(String::as_str).collect()
}

/// Move every transition already broadcast into `recorded`.
fn drain<T: Clone>(transitions: &mut Receiver<T>, recorded: &mut Vec<T>) -> Result<()> {
    loop {
        match transitions.try_recv() {
            Ok(transition) => recorded.push(transition),
            Err(TryRecvError::Lagged(skipped)) => {
                bail!("Replay lost {skipped} transitions after {} recorded", recorded.len());
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

/// Run `script` and return every transition it produced, in order.
pub async fn run_script(script: &Script, timeouts: Timeouts) -> Result<Vec<Transition>> {
    let directory = MemoryDirectory::new();
    directory.replace(&as_strs(&script.connected));
    let headset = RecordingHeadset::new(directory.clone());

    let machine = RouteStateMachine::new(
        Box::new(directory.clone()),
        Box::new(headset.clone()),
        timeouts,
        CallLock::default(),
    );
    let manager = RouteManager::spawn(machine);
    let mut transitions = manager.subscribe();
    let handle = manager.handle();

    handle
        .set_initial_state(script.initial_state.clone())
        .await
        .context("Invalid initial state")?;

    let mut recorded = Vec::new();

    for (index, step) in script.steps.iter().enumerate() {
        debug!(index, ?step, "Replaying step");
        match step {
            Step::SetConnected { devices } => directory.replace(&as_strs(devices)),
            Step::SetAudioActive { devices } => headset.set_active(&as_strs(devices)),
            Step::SetAcceptConnect { accept } => headset.set_accept_connect(*accept),
            Step::Send { event } => {
                match event {
                    RouteEvent::DeviceAdded { address } => directory.connect(address),
                    RouteEvent::DeviceLost { address } => directory.disconnect(address),
                    _ => {}
                }
                handle.send(event.clone())?;
            }
            Step::Wait { ms } => sleep(Duration::from_millis(*ms)).await,
        }
        handle.flush().await?;
        drain(&mut transitions, &mut recorded)?;
    }

    manager.shutdown().await?;
    drain(&mut transitions, &mut recorded)?;
    Ok(recorded)
}
