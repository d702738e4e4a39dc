//! Logging setup for the valuation bots.
//!
//! One subscriber is installed per process, before any report runs. Output is
//! either human-readable (`pretty`) or structured JSON (`json`).
//!
//! # Noise Filtering
//!
//! HTTP stack modules (hyper, reqwest, h2, rustls) are pinned to `warn` so the
//! request/response diagnostics of the bots themselves stay readable.
//! `RUST_LOG` overrides the whole filter.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Modules filtered to `warn` regardless of the configured level.
pub const NOISY_MODULES: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "tokio_util",
];

/// Build the filter directives for a base level plus noise suppression.
fn build_directives(log_level: &str) -> String {
    let mut directives = String::from(log_level);

    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }

    directives
}

fn build_filter(log_level: &str) -> EnvFilter {
    // Environment variable wins when present
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(build_directives(log_level))
}

/// Initialize logging.
///
/// # Arguments
///
/// * `log_level` - Base log level (trace, debug, info, warn, error)
/// * `log_format` - "json" for structured JSON, anything else for pretty output
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(log_level: &str, log_format: &str) {
    let filter = build_filter(log_level);

    let subscriber = tracing_subscriber::registry().with(filter);

    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(true)
            .with_file(false)
            .with_line_number(false);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::info!(
        log_level = %log_level,
        log_format = %log_format,
        noise_filtered = NOISY_MODULES.len(),
        "Logging initialized"
    );
}

/// Generate a new ID for tagging one report run.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
