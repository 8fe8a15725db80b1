//! Tracing setup for binaries built on this crate.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,till=debug,sqlx=warn";

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a subscriber was already installed (tests, embedding
/// apps).
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
