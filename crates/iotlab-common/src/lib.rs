//! ---
//! iotlab_section: "01-core-functionality"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Shared primitives and utilities for the lab services."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
//! Core shared primitives for the IoT lab workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the daemon and the operator CLI.

pub mod config;
pub mod logging;

pub use config::{
    ApiConfig, AppConfig, DeviceConfig, LoadedAppConfig, LoggingConfig, StorageBackend,
    StorageConfig,
};
pub use logging::{init_tracing, FilterSource, LogFormat};
