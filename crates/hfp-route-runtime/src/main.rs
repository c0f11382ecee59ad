//! Replay a routing script and print every transition as a JSON line.
//!
//! Usage: `hfp-route-replay <script.toml> [config.toml]`

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use hfp_route_runtime::{config, logging, replay};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args_os().skip(1);
    let Some(script_path) = args.next().map(PathBuf::from) else {
        bail!("usage: hfp-route-replay <script.toml> [config.toml]");
    };
    let config = match args.next() {
        Some(path) => config::load_config_from(&PathBuf::from(path))?,
        None => config::load_config()?,
    };

    logging::init(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), script = ?script_path, "Starting replay");

    let script = replay::load_script(&script_path)?;
    let transitions = replay::run_script(&script, config.timeouts.to_timeouts()).await?;

    let mut stdout = std::io::stdout().lock();
    for transition in &transitions {
        let line = serde_json::to_string(transition).context("Failed to serialize transition")?;
        writeln!(stdout, "{line}")?;
    }

    info!(count = transitions.len(), "Replay finished");
    Ok(())
}
