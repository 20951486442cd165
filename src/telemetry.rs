use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?;
    }

    tracing::debug!(log_level = %config.log_level, json = %config.json_logs, "Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the log lines of one tick
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common handoff attributes
pub fn create_tick_span(
    operation: &str,
    pending_pr: Option<u64>,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "handoff_tick",
        operation = operation,
        pr = pending_pr,
        correlation.id = correlation_id,
    )
}
