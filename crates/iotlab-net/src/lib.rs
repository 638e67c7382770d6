//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Device command encoding and datagram delivery."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
//! One-way actuation commands for lab devices.
//!
//! Commands travel as single UDP datagrams. Nothing is acknowledged and no
//! ordering is promised, so callers treat every send as fire-and-forget.
#![warn(missing_docs)]

use std::net::SocketAddr;

pub mod command;
pub mod sender;

pub use command::DeviceCommand;
pub use sender::{run_toggle, CommandSender};

/// Result alias for device command operations.
pub type Result<T> = std::result::Result<T, NetError>;

/// Failures raised while building or delivering device commands.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Text that does not follow the `<key>=<1|0>` format.
    #[error("invalid device command {input:?}: {reason}")]
    InvalidCommand {
        /// Offending input.
        input: String,
        /// Which rule it broke.
        reason: &'static str,
    },
    /// The local datagram socket could not be opened.
    #[error("failed to bind command socket on {addr}: {source}")]
    Bind {
        /// Local address that was requested.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// The operating system refused to emit the datagram.
    #[error("failed to send command to {peer}: {source}")]
    Send {
        /// Device address.
        peer: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
}
