/*!
 * Tracing Setup
 * Subscriber installation for the events the primitives emit
 *
 * Events:
 * - `trace`: contended acquisitions, signal/broadcast results
 * - `debug`: waits longer than the configured slow wait threshold
 * - `warn`: unrecognised configuration values
 * - `error`: precondition violations, right before the panic
 */

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable enabling JSON output
pub const TRACE_JSON_ENV: &str = "LOCKKIT_TRACE_JSON";

fn json_requested() -> bool {
    std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

/// Install a global subscriber, returning `false` if one is already set
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - LOCKKIT_TRACE_JSON: Enable JSON output (default: false)
pub fn try_init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_requested() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = json_requested(), "lockkit tracing initialized");
    }
    installed
}

/// Install a global subscriber
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    if !try_init_tracing() {
        panic!("a global tracing subscriber is already installed");
    }
}
