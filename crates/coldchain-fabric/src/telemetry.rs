use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Configuration for per-process telemetry initialization.
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_level: String,
}

/// Initialize tracing for a service process: `RUST_LOG` wins when set,
/// otherwise the configured level applies; output is structured JSON
/// with span context.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_span_list(true)
        .with_current_span(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(service = %config.service_name, "telemetry initialized");
    Ok(())
}
