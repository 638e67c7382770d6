//! ---
//! iotlab_section: "11-simulation"
//! iotlab_subsection: "01-bootstrap"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Simulated sensor module exports."
//! iotlab_version: "v0.1.0"
//! iotlab_owner: "tbd"
//! ---
//! Simulated sensor readings for lab devices without real hardware.

pub mod reader;

pub use reader::{seed_for, SensorReader, SensorReading, MAX_VALUE, MIN_VALUE};
