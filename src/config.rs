//! Runtime configuration
//!
//! Every option can be given as a flag or through its `RELAY_*` variable.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::api::websocket::state::DEFAULT_OUTBOUND_CAPACITY;
use crate::error::{RelayError, RelayResult};
use crate::types::DEFAULT_GROUP;

/// Command-line arguments for the relay server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Runs producer plugins and relays their output to WebSocket groups", long_about = None)]
pub struct Config {
    /// Interface both listeners bind to
    #[arg(long, env = "RELAY_BIND", default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// WebSocket listener port
    #[arg(short, long, env = "RELAY_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Status service port
    #[arg(long, env = "RELAY_STATUS_PORT", default_value_t = 5000)]
    pub status_port: u16,

    /// Do not start the status service
    #[arg(long, env = "RELAY_NO_STATUS")]
    pub no_status: bool,

    /// Directory scanned for plugin manifests
    #[arg(long, env = "RELAY_PLUGIN_DIR", default_value = "bots")]
    pub plugin_dir: PathBuf,

    /// Group used by plugins that do not name one
    #[arg(long, env = "RELAY_PUBLISH_GROUP", default_value = DEFAULT_GROUP)]
    pub publish_group: String,

    /// How long one subscriber may take to accept a message
    #[arg(long, env = "RELAY_DELIVERY_TIMEOUT_MS", default_value_t = 5000)]
    pub delivery_timeout_ms: u64,

    /// Messages buffered per connection before delivery waits
    #[arg(long, env = "RELAY_OUTBOUND_CAPACITY", default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    pub outbound_capacity: usize,

    /// How long shutdown waits for connections to drain
    #[arg(long, env = "RELAY_SHUTDOWN_GRACE_MS", default_value_t = 5000)]
    pub shutdown_grace_ms: u64,

    /// Log filter directive, e.g. `info` or `plugin_relay=debug`
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "RELAY_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn relay_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn status_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.status_port)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> RelayResult<()> {
        if self.publish_group.trim().is_empty() {
            return Err(RelayError::Config("publish group must not be empty".into()));
        }
        if self.delivery_timeout_ms == 0 {
            return Err(RelayError::Config("delivery timeout must be positive".into()));
        }
        if self.outbound_capacity == 0 {
            return Err(RelayError::Config("outbound capacity must be positive".into()));
        }
        if !self.no_status && self.port != 0 && self.port == self.status_port {
            return Err(RelayError::Config(format!(
                "relay and status service cannot share port {}",
                self.port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["relay-server"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.relay_addr().port(), 5001);
        assert_eq!(config.status_addr().port(), 5000);
        assert_eq!(config.plugin_dir, PathBuf::from("bots"));
        assert_eq!(config.publish_group, "default");
        assert_eq!(config.delivery_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&["--port", "7001", "--plugin-dir", "/tmp/p", "--publish-group", "asas", "--log-json"]);
        assert_eq!(config.port, 7001);
        assert_eq!(config.plugin_dir, PathBuf::from("/tmp/p"));
        assert_eq!(config.publish_group, "asas");
        assert!(config.log_json);
    }

    #[test]
    fn test_validate_rejects_shared_port() {
        let config = parse(&["--port", "6000", "--status-port", "6000"]);
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));

        let config = parse(&["--port", "6000", "--status-port", "6000", "--no-status"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = parse(&["--delivery-timeout-ms", "0"]);
        assert!(config.validate().is_err());
    }
}
