//! # ecofaq-telemetry
//!
//! Logging setup for EcoFAQ binaries and tests.
//!
//! Log output goes to stderr so that FAQ output on stdout stays clean. The
//! filter is read from `RUST_LOG`, falling back to a default directive.
//!
//! ```rust,ignore
//! ecofaq_telemetry::init_telemetry("ecofaq")?;
//! tracing::info!("ready");
//! ```
//!
//! For inspecting pipeline runs, attach an [`InMemorySpanLayer`] and read
//! the spans of a request back from its [`SpanRecorder`].

pub mod memory;

#[cfg(test)]
mod test_memory;

pub use memory::{InMemorySpanLayer, SpanRecord, SpanRecorder};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global subscriber printing human-readable logs.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(service_name: &str) -> Result<(), TryInitError> {
    init_with_options(service_name, LogFormat::Pretty, DEFAULT_FILTER)
}

/// Install a global subscriber printing JSON logs.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TryInitError> {
    init_with_options(service_name, LogFormat::Json, DEFAULT_FILTER)
}

/// Install a global subscriber with an explicit format and fallback filter.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_with_options(
    service_name: &str,
    format: LogFormat,
    default_filter: &str,
) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }

    tracing::debug!(service.name = service_name, ?format, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber that logs like [`init_telemetry`] and also
/// captures spans into `recorder`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_with_recorder(service_name: &str, recorder: SpanRecorder) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(InMemorySpanLayer::new(recorder))
        .try_init()?;

    tracing::debug!(service.name = service_name, "telemetry initialized with span recorder");
    Ok(())
}
