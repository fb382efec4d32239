//! Diagnostic logging setup
//!
//! Logs go to stderr so stdout carries only the decoded output. The filter
//! comes from `GCDM_LOG` (same syntax as `RUST_LOG`); without it the level is
//! `warn`, or `debug` for this crate with `--verbose`.

use crate::config::ENV_LOG;
use tracing_subscriber::EnvFilter;

/// Filter used when `GCDM_LOG` is unset or invalid
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,gcdm_client=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(ENV_LOG)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
