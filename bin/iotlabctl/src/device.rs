//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "binary"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Operator CLI for lab devices and simulated sensors."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use iotlab_common::config::{AppConfig, DeviceConfig};
use iotlab_net::{run_toggle, CommandSender, DeviceCommand};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tracing::{info, warn};

/// Where to find the device defaults.
#[derive(Debug, Args)]
pub struct DeviceOptions {
    /// Configuration file providing `[device]` defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Device address, overriding the configuration.
    #[arg(long, value_name = "ADDR")]
    pub peer: Option<SocketAddr>,
}

#[derive(Debug, Args)]
pub struct ToggleOptions {
    #[command(flatten)]
    pub device: DeviceOptions,
    /// Output to toggle, e.g. `GPIO4`.
    #[arg(long)]
    pub key: Option<String>,
    /// Delay between commands in milliseconds.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
    /// Stop after this many commands instead of waiting for ctrl-c.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SendOptions {
    #[command(flatten)]
    pub device: DeviceOptions,
    /// Command text such as `GPIO4=1`.
    pub command: DeviceCommand,
}

fn load_device(options: &DeviceOptions) -> Result<DeviceConfig> {
    let loaded = match &options.config {
        Some(path) => AppConfig::load_with_source(&[path])?,
        None => AppConfig::load_or_default(&["configs/iotlab.toml"])?,
    };
    let mut device = loaded.config.device;
    if let Some(peer) = options.peer {
        device.peer = peer;
    }
    Ok(device)
}

/// Run the toggle loop until ctrl-c or `--count` commands.
pub fn toggle(options: ToggleOptions) -> Result<()> {
    let mut device = load_device(&options.device)?;
    if let Some(key) = options.key {
        device.key = key;
    }
    if let Some(ms) = options.interval_ms {
        device.interval = Duration::from_millis(ms);
    }
    device.validate()?;
    let count = options.count;

    let runtime = Runtime::new()?;
    let sent = runtime.block_on(async {
        let sender = CommandSender::bind(device.peer).await?;
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("ctrl-c received; stopping"),
                Err(err) => warn!(error = %err, "failed to listen for ctrl-c"),
            }
            let _ = stop_tx.send(true);
        });
        let sent = run_toggle(&sender, &device.key, device.interval, count, stop_rx).await;
        Ok::<_, anyhow::Error>(sent)
    })?;
    println!("sent {sent} commands to {}", device.peer);
    Ok(())
}

/// Emit one command and exit.
pub fn send(options: SendOptions) -> Result<()> {
    let device = load_device(&options.device)?;
    let runtime = Runtime::new()?;
    runtime
        .block_on(async {
            let sender = CommandSender::bind(device.peer).await?;
            sender.send(&options.command).await
        })
        .with_context(|| format!("failed to deliver {} to {}", options.command, device.peer))?;
    println!("sent {} to {}", options.command, device.peer);
    Ok(())
}
