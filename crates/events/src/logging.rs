//! Tracing subscriber setup for formainframe hosts.
//!
//! Library crates only emit through `tracing`. The host embedding the
//! data-operations core installs the subscriber once with [`init_tracing`].

use crate::metadata::correlation_id;
use std::io;
use std::str::FromStr;
pub use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

/// Prefix shared by every formainframe crate name and event target.
const TARGET_PREFIX: &str = "formainframe";

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Multi-line, for reading in a terminal.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
    /// One line per event with source locations.
    Dev,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ("pretty", Self::Pretty),
            ("compact", Self::Compact),
            ("json", Self::Json),
            ("dev", Self::Dev),
        ]
        .into_iter()
        .find_map(|(name, format)| name.eq_ignore_ascii_case(s).then_some(format))
        .ok_or_else(|| format!("Unknown tracing format: {s}"))
    }
}

/// Verbosity as chosen in host settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: TracingFormat,
    /// Level for formainframe targets when neither `filter` nor `RUST_LOG` is set.
    pub level: Level,
    /// Only honoured by [`TracingFormat::Dev`].
    pub enable_file_location: bool,
    /// Explicit `EnvFilter` directive. Takes precedence over `RUST_LOG` and `level`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::default(),
            level: LogLevel::default().into(),
            enable_file_location: true,
            filter: None,
        }
    }
}

impl TracingConfig {
    fn env_filter(&self) -> Result<EnvFilter, String> {
        let directive = match &self.filter {
            Some(filter) => filter.clone(),
            None => match std::env::var(EnvFilter::DEFAULT_ENV) {
                Ok(from_env) if !from_env.trim().is_empty() => from_env,
                _ => default_filter(self.level),
            },
        };
        EnvFilter::try_new(&directive).map_err(|e| format!("invalid filter `{directive}`: {e}"))
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = tracing_subscriber::fmt::layer().with_writer(io::stderr);
        match self.format {
            TracingFormat::Pretty => base.pretty().with_thread_names(true).boxed(),
            TracingFormat::Compact => base.compact().with_target(false).boxed(),
            TracingFormat::Json => base
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed(),
            TracingFormat::Dev => base
                .with_file(self.enable_file_location)
                .with_line_number(self.enable_file_location)
                .boxed(),
        }
    }
}

/// Filter directive enabling `level` for every formainframe crate and event target.
///
/// Target directives match by prefix, so one directive covers
/// `formainframe_dataops::…` as well as `formainframe::sync`.
#[must_use]
pub fn default_filter(level: Level) -> String {
    format!("{TARGET_PREFIX}={}", level.as_str().to_ascii_lowercase())
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails on an invalid filter directive or when a global subscriber is
/// already installed.
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let filter = config
        .env_filter()
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter)
        .try_init()
        .map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::debug!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized"
    );
    Ok(())
}
