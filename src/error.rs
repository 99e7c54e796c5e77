//! Error types for the relay
//!
//! Every failure listed here is recovered locally except [`RelayError`],
//! which only surfaces from startup paths.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::hub::ConnectionId;

/// A plugin could not be turned into a schedulable unit
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot prepare plugin directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read plugin manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid plugin manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("plugin `{name}` is missing a positive interval")]
    MissingInterval { name: String },

    #[error("plugin `{name}` uses unknown producer kind `{kind}`")]
    UnknownProducer { name: String, kind: String },

    #[error("plugin `{name}` has invalid settings: {reason}")]
    InvalidSettings { name: String, reason: String },

    #[error("plugin `{0}` is already registered")]
    Duplicate(String),
}

/// A producer invocation failed; the tick is skipped
#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("malformed data: {0}")]
    Data(String),

    #[error("producer panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Delivery to a single connection failed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("connection {id} did not accept the message within {timeout:?}")]
    TimedOut { id: ConnectionId, timeout: Duration },
}

/// Unrecoverable startup failures
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type for startup operations
pub type RelayResult<T> = Result<T, RelayError>;
