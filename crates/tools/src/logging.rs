use tracing_subscriber::EnvFilter;

/// Filter directives for this tool; `RUST_LOG` is used when unset.
pub const LOG_ENV: &str = "TIMEMAP_LOG";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::from_default_env())
}

/// Installs the global subscriber. Logs go to stderr so stdout stays
/// machine-readable. Calling it twice is harmless.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}
