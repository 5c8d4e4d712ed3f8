//! Logging setup
//!
//! The library only emits through the `log` facade. Binaries call [`init`]
//! once at startup; `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use env_logger::{Builder, Env};

/// Default filter for the chosen verbosity
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Installs the global logger.
///
/// Fails if a logger is already installed.
pub fn init(debug: bool) -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(default_filter(debug)))
        .format_timestamp_millis()
        .try_init()
        .context("Failed to initialize logger")
}

/// Logger for tests: captured by the test harness, repeat calls are no-ops
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true), "debug");
        assert_eq!(default_filter(false), "info");
    }

    #[test]
    fn test_init_for_tests_is_repeatable() {
        init_for_tests();
        init_for_tests();
        log::debug!("logger installed");
    }
}
