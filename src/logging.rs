//! Tracing setup for the CLI.
//!
//! The filter comes from `NGFLAGS_LOG`, then `RUST_LOG`, then the `-v` count.
//! `NGFLAGS_LOG_FORMAT=json` emits one JSON object per event. All output goes
//! to stderr so it never mixes with the report on stdout.

use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "NGFLAGS_LOG";
pub const LOG_FORMAT_ENV: &str = "NGFLAGS_LOG_FORMAT";

/// Default directive for a `-v` count.
pub fn verbosity_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    for var in [LOG_ENV, EnvFilter::DEFAULT_ENV] {
        if let Ok(value) = std::env::var(var)
            && !value.trim().is_empty()
        {
            return EnvFilter::builder().parse_lossy(value);
        }
    }
    EnvFilter::new(verbosity_directive(verbosity))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(verbosity: u8) {
    let filter = build_filter(verbosity);
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let result = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
    };
    // Already installed, e.g. by a test harness.
    let _ = result;
}
