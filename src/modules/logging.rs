use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_LOG_FILTER;

static INIT: Once = Once::new();

/// Installs a stderr `fmt` subscriber filtered by `filter`
/// (`PERFREVIEW_LOG` syntax, e.g. `perfreview=debug`). Idempotent.
pub fn init_tracing(filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
