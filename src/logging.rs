//! Logging init for the `zipfetch` binary: structured events on stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(quiet: u8) -> &'static str {
    match quiet {
        0 => "info,zipfetch=debug",
        _ => "warn",
    }
}

/// Install a stderr subscriber. `RUST_LOG` overrides the default filter.
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_logging(quiet: u8) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
