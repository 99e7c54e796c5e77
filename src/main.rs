//! Plugin Relay - Binary Entry Point

use anyhow::Context;
use clap::Parser;

use plugin_relay::server::shutdown_on_signal;
use plugin_relay::{logging, Config, PluginRegistry, ProducerCatalog, RelayServer, NAME, VERSION};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init(&config.log_level, config.log_json)?;
    config.validate()?;

    tracing::info!(name = NAME, version = VERSION, relay = %config.relay_addr(), "Starting");

    let catalog = ProducerCatalog::with_builtins();
    tracing::debug!(kinds = ?catalog.kinds(), "Producer kinds available");
    let registry = PluginRegistry::load(&config.plugin_dir, &catalog)
        .with_context(|| format!("loading plugins from {}", config.plugin_dir.display()))?;
    if registry.is_empty() {
        tracing::warn!(dir = %config.plugin_dir.display(), "No plugins loaded");
    }

    let shutdown = shutdown_on_signal()?;
    RelayServer::new(config, registry).run(shutdown)?;
    Ok(())
}
