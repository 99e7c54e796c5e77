//! Producer plugins
//!
//! A plugin pairs an interval with an optional [`Producer`]. Plugins are
//! described by JSON manifests in a directory and instantiated through a
//! [`ProducerCatalog`] of known producer kinds, or registered directly.

pub mod builtin;
mod catalog;
mod manifest;
mod producer;
mod registry;

pub use catalog::{ProducerCatalog, ProducerFactory};
pub use manifest::{PluginManifest, MANIFEST_EXTENSION, PRIVATE_MARKER};
pub use producer::{Plugin, Producer};
pub use registry::PluginRegistry;
