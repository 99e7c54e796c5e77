//! Plugin discovery and the name → plugin table

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::catalog::ProducerCatalog;
use super::manifest::{PluginManifest, MANIFEST_EXTENSION, PRIVATE_MARKER};
use super::producer::Plugin;
use crate::error::LoadError;
use crate::types::PluginSummary;

/// Loaded plugins keyed by name
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every manifest in `dir`
    ///
    /// A missing directory is created and yields an empty registry. Units
    /// that fail to load are logged and skipped; only a directory that
    /// cannot be created or listed is an error.
    pub fn load(dir: &Path, catalog: &ProducerCatalog) -> Result<Self, LoadError> {
        let mut registry = Self::new();

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| LoadError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::info!(dir = %dir.display(), "Created plugin directory");
            return Ok(registry);
        }

        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(|source| LoadError::Directory {
                path: dir.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.starts_with(PRIVATE_MARKER) {
                tracing::debug!(file = %file_name, "Skipping private file");
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
                tracing::debug!(file = %file_name, "Skipping non-manifest file");
                continue;
            }

            match Self::load_unit(&path, catalog).and_then(|plugin| registry.register(plugin)) {
                Ok(()) => {}
                Err(e @ LoadError::MissingInterval { .. }) => {
                    tracing::warn!(file = %file_name, error = %e, "Plugin skipped");
                }
                Err(e) => {
                    tracing::error!(file = %file_name, error = %e, "Failed to load plugin");
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            plugins = registry.len(),
            "Plugin directory loaded"
        );
        Ok(registry)
    }

    /// Turn one manifest file into a plugin
    pub fn load_unit(path: &Path, catalog: &ProducerCatalog) -> Result<Plugin, LoadError> {
        let manifest = PluginManifest::read(path)?;
        let name = manifest.plugin_name(path);

        let interval = manifest
            .positive_interval()
            .ok_or_else(|| LoadError::MissingInterval { name: name.clone() })?;
        let mut plugin = Plugin::from_secs_f64(name.clone(), interval)?;

        if let Some(kind) = manifest.producer.as_deref() {
            let producer = catalog.build(kind, &name, &manifest.settings)?;
            plugin = plugin.with_producer(kind, producer);
        }
        if let Some(group) = manifest.target_group {
            plugin = plugin.with_target_group(group);
        }
        Ok(plugin)
    }

    /// Add a plugin, rejecting duplicate names
    pub fn register(&mut self, plugin: Plugin) -> Result<(), LoadError> {
        if self.plugins.contains_key(plugin.name()) {
            return Err(LoadError::Duplicate(plugin.name().to_string()));
        }
        tracing::info!(
            plugin = %plugin.name(),
            interval = ?plugin.interval(),
            producer = plugin.kind().unwrap_or("-"),
            "Loaded plugin"
        );
        self.plugins.insert(plugin.name().to_string(), plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Status view of every plugin
    pub fn summaries(&self, default_group: &str) -> Vec<PluginSummary> {
        self.iter().map(|p| p.summary(default_group)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_missing_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("bots");

        let registry = PluginRegistry::load(&dir, &ProducerCatalog::with_builtins()).unwrap();
        assert!(registry.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_load_skips_bad_units_and_keeps_good_ones() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        write(dir, "good.json", r#"{"interval": 1, "producer": "static", "settings": {"payload": 1}}"#);
        write(dir, "no_interval.json", r#"{"producer": "static"}"#);
        write(dir, "zero.json", r#"{"interval": 0}"#);
        write(dir, "broken.json", "{ not json");
        write(dir, "unknown.json", r#"{"interval": 2, "producer": "teleport"}"#);
        write(dir, "__private.json", r#"{"interval": 1}"#);
        write(dir, "notes.txt", "hello");

        let registry = PluginRegistry::load(dir, &ProducerCatalog::with_builtins()).unwrap();
        assert_eq!(registry.names(), vec!["good"]);
        assert_eq!(registry.get("good").unwrap().interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_unit_without_producer_is_registered() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "idle.json", r#"{"interval": 0.25, "target_group": "admin"}"#);

        let registry = PluginRegistry::load(tmp.path(), &ProducerCatalog::new()).unwrap();
        let plugin = registry.get("idle").unwrap();
        assert!(plugin.producer().is_none());
        assert_eq!(plugin.interval(), Duration::from_millis(250));
        assert_eq!(plugin.target_group(), Some("admin"));
    }

    #[test]
    fn test_manifest_name_overrides_stem() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.json", r#"{"name": "shared", "interval": 1}"#);
        write(tmp.path(), "b.json", r#"{"name": "shared", "interval": 2}"#);

        let registry = PluginRegistry::load(tmp.path(), &ProducerCatalog::new()).unwrap();
        assert_eq!(registry.len(), 1);
        // Sorted load order: a.json wins, b.json is a duplicate
        assert_eq!(registry.get("shared").unwrap().interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = PluginRegistry::new();
        let plugin = Plugin::new("p", Duration::from_secs(1)).unwrap();
        registry.register(plugin.clone()).unwrap();

        assert!(matches!(registry.register(plugin), Err(LoadError::Duplicate(name)) if name == "p"));
    }

    #[test]
    fn test_summaries() {
        let mut registry = PluginRegistry::new();
        registry
            .register(Plugin::new("p", Duration::from_secs(2)).unwrap())
            .unwrap();

        let summaries = registry.summaries("default");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].target_group, "default");
    }
}
