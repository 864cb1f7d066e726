use crate::config::Environment;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

pub(crate) fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initialize the global tracing subscriber without an exporter: pretty
/// output in development, JSON lines in production.
///
/// Use [`crate::TelemetryGuard::init`] instead when an OTLP collector is
/// available; it installs the same formatting plus the OpenTelemetry layer.
pub fn setup_logging(environment: Environment) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    match environment {
        Environment::Production => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_level(true)
                    .with_current_span(true),
            )
            .try_init()?,
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .try_init()?,
    }

    Ok(())
}
