//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Device command encoding and datagram delivery."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::NetError;

/// Switch a named device output on or off, written as `"<key>=<1|0>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCommand {
    /// Output identifier understood by the device, e.g. `GPIO4`.
    pub key: String,
    /// Requested state.
    pub on: bool,
}

impl DeviceCommand {
    /// Build a command for `key`.
    pub fn new(key: impl Into<String>, on: bool) -> Self {
        Self {
            key: key.into(),
            on,
        }
    }

    /// Command with the opposite state for the same key.
    pub fn toggled(&self) -> Self {
        Self::new(self.key.clone(), !self.on)
    }

    /// ASCII payload placed in the datagram.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, if self.on { 1 } else { 0 })
    }
}

impl FromStr for DeviceCommand {
    type Err = NetError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| NetError::InvalidCommand {
            input: input.to_owned(),
            reason,
        };
        let (key, value) = input
            .trim()
            .split_once('=')
            .ok_or_else(|| invalid("expected <key>=<1|0>"))?;
        if key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        let on = match value {
            "1" => true,
            "0" => false,
            _ => return Err(invalid("value must be 1 or 0")),
        };
        Ok(Self::new(key, on))
    }
}
