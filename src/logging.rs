use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "cona_backend=info,tower_http=info,sqlx=warn";

/// `RUST_LOG` wins over the built-in default filter.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter());
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).init(),
    }
}
