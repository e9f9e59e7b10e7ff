//! Logging setup for the command line entry point

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "roster_identity=info";

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; `verbose` lowers the default to debug.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "roster_identity=debug" } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
