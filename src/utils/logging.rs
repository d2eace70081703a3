//! Logging initialization
//!
//! Thin wrappers around `tracing-subscriber`. The `RUST_LOG` environment
//! variable always takes precedence; an explicit filter applies only when
//! `RUST_LOG` is unset; the final fallback is "info".

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::new("info"),
    }
}

/// Initialize human-readable logging.
///
/// # Arguments
/// * `filter` - Optional filter (e.g. "info", "modkit=debug") used when
///   `RUST_LOG` is unset
///
/// # Example
/// ```no_run
/// use modkit::utils::init_logging;
///
/// // Use RUST_LOG, or default to "info"
/// init_logging(None);
///
/// // Config-provided filter (RUST_LOG still takes precedence)
/// init_logging(Some("modkit=debug"));
/// ```
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .init();
}

/// Initialize JSON logging for log aggregation systems.
///
/// # Arguments
/// * `filter` - Optional filter used when `RUST_LOG` is unset
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .init();
}
