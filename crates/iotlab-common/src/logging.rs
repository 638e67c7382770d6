//! ---
//! iotlab_section: "01-core-functionality"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Tracing subscriber setup for the lab services."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use std::fmt as stdfmt;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "IOTLAB_LOG";
const RUST_LOG_ENV: &str = "RUST_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Keeps the non-blocking writers flushing until the process exits.
struct WriterGuards {
    _file: WorkerGuard,
    _stdout: WorkerGuard,
}

static GUARDS: OnceCell<WriterGuards> = OnceCell::new();

/// Output format of the stdout layer. The rolling file is always JSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Where the active filter directive came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    IotlabLog,
    RustLog,
    Default,
    /// The directive in `variable` did not parse and `info` is used instead.
    Fallback { variable: &'static str, error: String },
}

impl stdfmt::Display for FilterSource {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        match self {
            FilterSource::IotlabLog => f.write_str(LOG_ENV),
            FilterSource::RustLog => f.write_str(RUST_LOG_ENV),
            FilterSource::Default => f.write_str("default"),
            FilterSource::Fallback { variable, .. } => write!(f, "default (invalid {variable})"),
        }
    }
}

/// Pick the filter: `IOTLAB_LOG` wins over `RUST_LOG`, and both fall back to `info`.
pub fn resolve_filter(
    iotlab_log: Option<String>,
    rust_log: Option<String>,
) -> (EnvFilter, FilterSource) {
    let (variable, directive, source) = match (iotlab_log, rust_log) {
        (Some(directive), _) => (LOG_ENV, directive, FilterSource::IotlabLog),
        (None, Some(directive)) => (RUST_LOG_ENV, directive, FilterSource::RustLog),
        (None, None) => return (EnvFilter::new(DEFAULT_DIRECTIVE), FilterSource::Default),
    };
    match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, source),
        Err(err) => (
            EnvFilter::new(DEFAULT_DIRECTIVE),
            FilterSource::Fallback {
                variable,
                error: err.to_string(),
            },
        ),
    }
}

/// Base name of the daily log file: the configured prefix, else the service name.
pub fn log_file_prefix(service_name: &str, config: &LoggingConfig) -> String {
    match config.file_prefix.as_deref().map(str::trim) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}.log"),
        _ => format!("{service_name}.log"),
    }
}

fn stdout_layer<S>(format: LogFormat, writer: NonBlocking) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::StructuredJson => layer
            .with_target(false)
            .json()
            .flatten_event(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => layer.with_target(true).with_writer(writer).boxed(),
    }
}

/// Install the global subscriber for `service_name`.
///
/// Events go to stdout in the configured [`LogFormat`] and to a daily rolling
/// JSON file below `config.directory`. A second call leaves the first
/// subscriber in place.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("unable to create log directory {}", config.directory.display())
    })?;
    let file_name = log_file_prefix(service_name, config);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, &file_name));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let (filter, source) = resolve_filter(
        std::env::var(LOG_ENV).ok(),
        std::env::var(RUST_LOG_ENV).ok(),
    );

    let file_layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .json()
        .with_writer(file_writer);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer(config.format, stdout_writer))
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        return Ok(());
    }
    let _ = GUARDS.set(WriterGuards {
        _file: file_guard,
        _stdout: stdout_guard,
    });

    if let FilterSource::Fallback { variable, error } = &source {
        warn!(variable = *variable, %error, "ignoring invalid log directive");
    }
    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        log_file = %file_name,
        format = ?config.format,
        filter_source = %source,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filter_prefers_iotlab_log_then_rust_log() {
        let (_, source) = resolve_filter(Some("debug".into()), Some("trace".into()));
        assert_eq!(source, FilterSource::IotlabLog);
        let (_, source) = resolve_filter(None, Some("warn,tower_http=debug".into()));
        assert_eq!(source, FilterSource::RustLog);
        let (filter, source) = resolve_filter(None, None);
        assert_eq!(source, FilterSource::Default);
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn invalid_directive_falls_back_to_info() {
        let (filter, source) = resolve_filter(Some("iotlab=notalevel".into()), None);
        assert!(matches!(source, FilterSource::Fallback { variable: "IOTLAB_LOG", .. }));
        assert_eq!(filter.to_string(), "info");
        assert_eq!(source.to_string(), "default (invalid IOTLAB_LOG)");
    }

    #[test]
    fn file_prefix_defaults_to_service_name() {
        let mut config = LoggingConfig::default();
        assert_eq!(log_file_prefix("iotlabd", &config), "iotlabd.log");
        config.file_prefix = Some("lab-gateway".into());
        assert_eq!(log_file_prefix("iotlabd", &config), "lab-gateway.log");
        config.file_prefix = Some("  ".into());
        assert_eq!(log_file_prefix("iotlabd", &config), "iotlabd.log");
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("test".into()),
        };
        init_tracing("iotlab-test", &config).unwrap();
        assert!(config.directory.is_dir());
    }
}
