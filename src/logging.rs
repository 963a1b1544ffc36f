// Logging setup using `tracing` and `tracing-subscriber`.
//
// Logs go to stderr so the console tables on stdout stay readable.
// `RUST_LOG` takes precedence over the configured default level.
//
// - `warn`: unreadable tables, ambiguous trial ids, dangling allocations
// - `info`: table row counts, join-key strategy
// - `debug`: filter results, selection resolution, utilization sources

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(default_level: &str) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging("debug");
        init_logging("warn");
        tracing::info!("logging initialised twice without panicking");
    }

    #[test]
    fn invalid_level_falls_back() {
        let filter = env_filter("not a [valid directive");
        assert!(!filter.to_string().is_empty());
    }
}
