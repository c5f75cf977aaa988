//! # Logging Setup
//!
//! Library code only emits `tracing` events. Binaries install the
//! subscriber once at startup.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=kirana=trace` - Show trace for kirana crates only
//! - Default: `info,kirana=debug,sqlx=warn`

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,kirana=debug,sqlx=warn";

/// Installs the fmt subscriber. Panics if a global subscriber is already
/// set; use [`try_init_tracing`] where that can happen.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .init();
}

/// Like [`init_tracing`], but returns false instead of panicking when a
/// subscriber is already installed (e.g. several tests in one process).
pub fn try_init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_refused() {
        try_init_tracing();
        assert!(!try_init_tracing());
    }
}
