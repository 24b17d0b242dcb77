//! Structured logging setup for the process.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies. Safe to
/// call more than once — later calls are no-ops.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let fmt_layer = fmt::layer().json().with_target(true).with_level(true);
        let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
    } else {
        let fmt_layer = fmt::layer().compact().with_target(true).with_level(true);
        let _ = Registry::default().with(env_filter).with(fmt_layer).try_init();
    }
}
