//! ---
//! iotlab_section: "03-persistence-logging"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Structured logging adapters and sinks."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
/// Emit an event at the given level enriched with a [`LogContext`](crate::LogContext).
#[doc(hidden)]
#[macro_export]
macro_rules! __iotlab_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            sensor = ctx.sensor.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with resource context.
#[macro_export]
macro_rules! iotlab_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__iotlab_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__iotlab_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with resource context.
#[macro_export]
macro_rules! iotlab_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__iotlab_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__iotlab_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with resource context.
#[macro_export]
macro_rules! iotlab_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__iotlab_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__iotlab_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
