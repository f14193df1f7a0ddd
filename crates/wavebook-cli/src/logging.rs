//! Logging setup for the CLI.
//!
//! Diagnostics go to stderr so that command output on stdout stays clean.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Map the `-v` count to a level: 0 info, 1 debug, 2+ trace.
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Build the filter. `RUST_LOG` wins over the verbosity flag.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("wavebook={level},wavebook_cli={level},warn"))
    })
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(verbosity: u8) {
    let filter = build_env_filter(level_from_verbosity(verbosity));
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 0)
        .without_time();

    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), Level::INFO);
        assert_eq!(level_from_verbosity(1), Level::DEBUG);
        assert_eq!(level_from_verbosity(2), Level::TRACE);
        assert_eq!(level_from_verbosity(9), Level::TRACE);
    }
}
