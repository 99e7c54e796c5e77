//! Plugin Relay
//!
//! Loads producer plugins from a directory, runs each one on its own fixed
//! delay, and fans every non-empty result out to a named group of WebSocket
//! subscribers.
//!
//! # Modules
//!
//! - `plugins`: Manifest loading, the producer trait and built-in producers
//! - `scheduler`: One periodic task per plugin
//! - `hub`: Group membership and concurrent fan-out
//! - `api`: WebSocket listener and HTTP status service
//! - `server`: Runtime wiring and shutdown
//! - `config`, `logging`, `error`, `types`: Shared plumbing
//!
//! # Example
//!
//! ```no_run
//! use plugin_relay::{Config, PluginRegistry, ProducerCatalog, RelayServer};
//! use clap::Parser;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::parse();
//!     let registry = PluginRegistry::load(&config.plugin_dir, &ProducerCatalog::with_builtins())?;
//!     let shutdown = plugin_relay::server::shutdown_on_signal()?;
//!     RelayServer::new(config, registry).run(shutdown)?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod plugins;
pub mod scheduler;
pub mod server;
pub mod types;

// Re-export commonly used items at crate root
pub use config::Config;
pub use error::{LoadError, ProduceError, RelayError, RelayResult, SendError};
pub use hub::{BroadcastHub, ConnectionHandle, PayloadSink};
pub use plugins::{Plugin, PluginRegistry, Producer, ProducerCatalog};
pub use scheduler::{Scheduler, TickOutcome};
pub use server::RelayServer;
pub use types::{Payload, PublishReport, DEFAULT_GROUP};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
