//! # Observability
//!
//! Structured logging through `tracing`. The filter comes from `RUST_LOG`
//! and falls back to [`DEFAULT_FILTER`]. Output goes to stderr so the
//! `query` command can keep stdout for its JSON response.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "genomic_overlap=info,tower_http=info";

/// Install the global subscriber.
///
/// Returns false when a subscriber was already installed.
pub fn init(format: LogFormat) -> bool {
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into()));

    let (json, pretty) = match format {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .is_ok()
}
