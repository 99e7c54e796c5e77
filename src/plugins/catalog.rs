//! Producer kinds known to the loader
//!
//! Manifests name a producer kind; the catalog maps that name to a
//! constructor. Only kinds registered here can be loaded from disk.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::builtin;
use super::producer::Producer;
use crate::error::LoadError;

/// Builds a producer from a plugin name and its manifest settings
pub type ProducerFactory =
    Arc<dyn Fn(&str, &Value) -> Result<Arc<dyn Producer>, LoadError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ProducerCatalog {
    factories: BTreeMap<String, ProducerFactory>,
}

impl ProducerCatalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with every built-in producer kind
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(builtin::STATIC_KIND, |name, settings| {
            Ok(Arc::new(builtin::StaticPayload::from_settings(name, settings)?) as Arc<dyn Producer>)
        });
        catalog.register(builtin::PRICE_LEVELS_KIND, |name, settings| {
            Ok(Arc::new(builtin::PriceLevels::from_settings(name, settings)?) as Arc<dyn Producer>)
        });
        catalog
    }

    /// Register (or replace) a producer kind
    pub fn register<F>(&mut self, kind: &str, factory: F) -> &mut Self
    where
        F: Fn(&str, &Value) -> Result<Arc<dyn Producer>, LoadError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.to_string(), Arc::new(factory));
        self
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate a producer for `plugin`
    pub fn build(
        &self,
        kind: &str,
        plugin: &str,
        settings: &Value,
    ) -> Result<Arc<dyn Producer>, LoadError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| LoadError::UnknownProducer {
                name: plugin.to_string(),
                kind: kind.to_string(),
            })?;
        factory(plugin, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProduceError;
    use crate::types::Payload;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let catalog = ProducerCatalog::with_builtins();
        assert_eq!(catalog.kinds(), vec!["price_levels", "static"]);
    }

    #[test]
    fn test_unknown_kind() {
        let catalog = ProducerCatalog::new();
        let err = catalog.build("nope", "p", &Value::Null).err().unwrap();
        assert!(matches!(err, LoadError::UnknownProducer { kind, .. } if kind == "nope"));
    }

    #[test]
    fn test_custom_kind() {
        let mut catalog = ProducerCatalog::new();
        catalog.register("answer", |_, _| {
            let answer = || -> Result<Option<Payload>, ProduceError> { Ok(Some(json!(42))) };
            Ok(Arc::new(answer) as Arc<dyn Producer>)
        });

        let producer = catalog.build("answer", "p", &Value::Null).unwrap();
        assert_eq!(producer.produce().unwrap(), Some(json!(42)));
    }
}
