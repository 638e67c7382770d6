//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Device command encoding and datagram delivery."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use iotlab_logging::{iotlab_debug, iotlab_error, iotlab_info, LogContext};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::{DeviceCommand, NetError, Result};

/// Datagram socket aimed at a single device.
#[derive(Debug)]
pub struct CommandSender {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl CommandSender {
    /// Bind an ephemeral local port in the peer's address family.
    pub async fn bind(peer: SocketAddr) -> Result<Self> {
        let local = match peer {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| NetError::Bind {
                addr: local,
                source,
            })?;
        Ok(Self { socket, peer })
    }

    /// Device address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|source| NetError::Bind {
            addr: self.peer,
            source,
        })
    }

    /// Emit `command` as one datagram. Delivery is not confirmed.
    pub async fn send(&self, command: &DeviceCommand) -> Result<()> {
        self.socket
            .send_to(&command.encode(), self.peer)
            .await
            .map_err(|source| NetError::Send {
                peer: self.peer,
                source,
            })?;
        iotlab_debug!(
            context = LogContext::new().with_resource(&command.key).with_operation("send"),
            "sent {command} to {}",
            self.peer
        );
        Ok(())
    }
}

/// Alternate `key` between on and off every `interval`, starting with on.
///
/// The first datagram is always `key=1`. Devices flashed with the older
/// firmware that expected `key=0` first will see the same square wave shifted
/// by one interval.
///
/// Stops once `shutdown` reads `true` (or its sender is dropped) or after
/// `limit` attempts. Failed sends are logged and the loop carries on.
/// Returns how many datagrams were handed to the socket.
pub async fn run_toggle(
    sender: &CommandSender,
    key: &str,
    interval: Duration,
    limit: Option<u64>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let ctx = LogContext::new().with_resource(key).with_operation("toggle");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut command = DeviceCommand::new(key, true);
    let mut attempts = 0_u64;
    let mut sent = 0_u64;
    iotlab_info!(
        context = ctx,
        "toggling {key} on {} every {}ms",
        sender.peer(),
        interval.as_millis()
    );

    loop {
        if limit.is_some_and(|limit| attempts >= limit) || *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        attempts += 1;
        match sender.send(&command).await {
            Ok(()) => sent += 1,
            Err(err) => iotlab_error!(context = ctx, "{err}"),
        }
        command = command.toggled();
    }

    iotlab_info!(context = ctx, "toggle loop stopped after {sent} datagrams");
    sent
}
