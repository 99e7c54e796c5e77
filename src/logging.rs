//! Logging setup

use tracing_subscriber::EnvFilter;

use crate::error::{RelayError, RelayResult};

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level` when set. Fails if a subscriber is already
/// installed or the directive does not parse.
pub fn init(level: &str, json: bool) -> RelayResult<()> {
    let filter = build_filter(level, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| RelayError::Logging(e.to_string()))
}

fn build_filter(level: &str, from_env: Option<String>) -> RelayResult<EnvFilter> {
    let directives = from_env
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(directives).map_err(|e| RelayError::Logging(e.to_string()))
}
