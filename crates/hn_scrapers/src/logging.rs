use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs the global `tracing` subscriber once. `RUST_LOG` wins over
/// `default_filter` when it is set.
pub fn init_logging(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        // Another subscriber may have won the race; that one stays in place.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
