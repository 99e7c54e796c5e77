//! Producer contract and the scheduled plugin unit

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LoadError, ProduceError};
use crate::types::{Payload, PluginSummary};

/// A unit of work that yields data on its plugin's timer
///
/// `Ok(None)` means "nothing this tick". Implementations may block; the
/// scheduler runs every invocation on the blocking pool.
pub trait Producer: Send + Sync {
    fn produce(&self) -> Result<Option<Payload>, ProduceError>;
}

impl<F> Producer for F
where
    F: Fn() -> Result<Option<Payload>, ProduceError> + Send + Sync,
{
    fn produce(&self) -> Result<Option<Payload>, ProduceError> {
        self()
    }
}

/// A loaded plugin: a name, an interval and possibly a producer
///
/// A plugin without a producer is still scheduled; every tick logs and skips.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    interval: Duration,
    target_group: Option<String>,
    kind: Option<String>,
    producer: Option<Arc<dyn Producer>>,
}

impl Plugin {
    /// Create a plugin, rejecting zero intervals
    pub fn new(name: impl Into<String>, interval: Duration) -> Result<Self, LoadError> {
        let name = name.into();
        if interval.is_zero() {
            return Err(LoadError::MissingInterval { name });
        }
        Ok(Self {
            name,
            interval,
            target_group: None,
            kind: None,
            producer: None,
        })
    }

    /// Create a plugin from an interval in seconds
    pub fn from_secs_f64(name: impl Into<String>, secs: f64) -> Result<Self, LoadError> {
        let name = name.into();
        match Duration::try_from_secs_f64(secs) {
            Ok(interval) => Self::new(name, interval),
            Err(_) => Err(LoadError::MissingInterval { name }),
        }
    }

    pub fn with_producer(mut self, kind: impl Into<String>, producer: Arc<dyn Producer>) -> Self {
        self.kind = Some(kind.into());
        self.producer = Some(producer);
        self
    }

    pub fn with_target_group(mut self, group: impl Into<String>) -> Self {
        self.target_group = Some(group.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Group this plugin publishes to, if it overrides the default
    pub fn target_group(&self) -> Option<&str> {
        self.target_group.as_deref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn producer(&self) -> Option<&Arc<dyn Producer>> {
        self.producer.as_ref()
    }

    /// Status view, resolving the target group against `default_group`
    pub fn summary(&self, default_group: &str) -> PluginSummary {
        PluginSummary {
            name: self.name.clone(),
            interval_secs: self.interval.as_secs_f64(),
            target_group: self.target_group.as_deref().unwrap_or(default_group).to_string(),
            producer: self.kind.clone(),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("target_group", &self.target_group)
            .field("kind", &self.kind)
            .field("has_producer", &self.producer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zero_interval_rejected() {
        assert!(matches!(
            Plugin::new("p", Duration::ZERO),
            Err(LoadError::MissingInterval { .. })
        ));
        assert!(Plugin::from_secs_f64("p", -1.0).is_err());
        assert!(Plugin::from_secs_f64("p", f64::NAN).is_err());
        assert!(Plugin::from_secs_f64("p", 0.5).is_ok());
    }

    #[test]
    fn test_closure_producer() {
        let producer = || -> Result<Option<Payload>, ProduceError> { Ok(Some(json!({"A": 1}))) };
        let plugin = Plugin::new("p", Duration::from_secs(1))
            .unwrap()
            .with_producer("closure", Arc::new(producer));

        let value = plugin.producer().unwrap().produce().unwrap();
        assert_eq!(value, Some(json!({"A": 1})));
    }

    #[test]
    fn test_summary_uses_default_group() {
        let plugin = Plugin::new("p", Duration::from_secs(3)).unwrap();
        let summary = plugin.summary("default");
        assert_eq!(summary.target_group, "default");
        assert_eq!(summary.interval_secs, 3.0);
        assert_eq!(summary.producer, None);

        let summary = plugin.with_target_group("admin").summary("default");
        assert_eq!(summary.target_group, "admin");
    }
}
