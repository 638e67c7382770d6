//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Structured logging adapters and sinks."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Resource-aware logging helpers shared by the API and the operator CLI.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for command line tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Sensor identifier associated with the log event.
    pub sensor: Option<&'a str>,
    /// Named resource (configuration file or text file) the event concerns.
    pub resource: Option<&'a str>,
    /// Operation being performed (`create`, `update`, `delete`, ...).
    pub operation: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sensor identifier.
    pub fn with_sensor(mut self, sensor: &'a str) -> Self {
        self.sensor = Some(sensor);
        self
    }

    /// Attach a resource name.
    pub fn with_resource(mut self, resource: &'a str) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Attach an operation descriptor.
    pub fn with_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }
}

/// Outcome used when emitting resource lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation was refused because of the caller's input or resource state.
    Rejected,
    /// The operation failed because of a server-side fault.
    Fault,
}

impl EventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Success => "success",
            EventOutcome::Rejected => "rejected",
            EventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized resource event. Faults are logged at ERROR, rejections at
/// WARN and successes at INFO.
pub fn log_resource_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: EventOutcome,
) {
    let fallback = LogContext::default();
    let ctx = context.unwrap_or(&fallback);
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                sensor = ctx.sensor.unwrap_or(""),
                resource = ctx.resource.unwrap_or(""),
                operation = ctx.operation.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        EventOutcome::Success => emit!(Level::INFO),
        EventOutcome::Rejected => emit!(Level::WARN),
        EventOutcome::Fault => emit!(Level::ERROR),
    }
}
