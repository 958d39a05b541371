//! Tracing subscriber setup for campus services.

use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub environment: String,
    /// `LOG_FORMAT=json` switches from pretty output to JSON lines.
    pub json: bool,
    /// Fallback filter when `RUST_LOG` is unset or invalid.
    pub level: String,
    /// Adds file and line to every record.
    pub include_location: bool,
}

impl TracingConfig {
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            environment: env::var("ENV_MODE").unwrap_or_else(|_| "development".to_string()),
            json: env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false),
            level: "info".to_string(),
            include_location: env::var("LOG_LOCATION").map(|v| v == "true").unwrap_or(false),
        }
    }
}

/// Installs the global subscriber.
pub fn init_tracing(config: TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = config.json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
    });
    let pretty = (!config.json).then(|| {
        fmt::layer()
            .pretty()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
    });

    tracing_subscriber::registry().with(filter).with(json).with(pretty).init();

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        json = config.json,
        "Tracing initialized"
    );
}
