//! Structured logging setup with tracing

use crate::config::{LogFormat, LoggingSettings};
use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_directive()));

    let subscriber = Registry::default().with(env_filter);

    match settings.format {
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_current_span(true).with_target(true);
            subscriber
                .with(json_layer)
                .try_init()
                .context("Failed to install JSON log subscriber")?;
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer().with_target(true).compact();
            subscriber
                .with(fmt_layer)
                .try_init()
                .context("Failed to install log subscriber")?;
        }
    }

    tracing::info!(
        "Logging initialized: level={}, format={:?}",
        settings.level.as_directive(),
        settings.format
    );

    Ok(())
}
