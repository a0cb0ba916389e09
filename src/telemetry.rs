use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;
use crate::error::{ModelflowError, Result};

/// Environment variable read for the log filter directive.
pub const LOG_ENV: &str = "MODELFLOW_LOG";

/// Installs the global subscriber. `MODELFLOW_LOG` overrides the default
/// level (`info`, or `debug` when `verbose`).
pub fn init(verbose: bool, format: LogFormat) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| ModelflowError::Config(format!("logging already initialized: {e}")))?;

    tracing::debug!(?format, "telemetry initialized");
    Ok(())
}
