//! Periodic plugin scheduler
//!
//! Each plugin gets its own task. A tick invokes the producer on the blocking
//! pool, publishes a non-empty result to the plugin's target group, then
//! sleeps for exactly the plugin's interval (fixed delay, not fixed rate).
//! Failures and panics inside a producer are logged and end only that tick.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::ProduceError;
use crate::hub::PayloadSink;
use crate::plugins::{Plugin, PluginRegistry};
use crate::types::{Payload, PublishReport};

/// What happened during one tick
#[derive(Debug)]
pub enum TickOutcome {
    Published(PublishReport),
    Empty,
    Failed(ProduceError),
    NoProducer,
}

/// Spawns and tracks one task per plugin
pub struct Scheduler {
    sink: Arc<dyn PayloadSink>,
    default_group: String,
}

impl Scheduler {
    /// `default_group` is used for plugins without their own target group
    pub fn new(sink: Arc<dyn PayloadSink>, default_group: impl Into<String>) -> Self {
        Self {
            sink,
            default_group: default_group.into(),
        }
    }

    /// Spawn a task for every plugin in the registry
    pub fn spawn_all(&self, registry: &PluginRegistry) -> SchedulerHandle {
        let tasks = registry
            .iter()
            .map(|plugin| (plugin.name().to_string(), self.spawn(plugin.clone())))
            .collect();
        SchedulerHandle { tasks }
    }

    /// Spawn the periodic task for one plugin on the current runtime
    pub fn spawn(&self, plugin: Plugin) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let group = plugin
            .target_group()
            .unwrap_or(&self.default_group)
            .to_string();

        tracing::info!(
            plugin = %plugin.name(),
            interval = ?plugin.interval(),
            group = %group,
            "Scheduling plugin"
        );

        tokio::spawn(async move {
            loop {
                tick(&plugin, sink.as_ref(), &group).await;
                tokio::time::sleep(plugin.interval()).await;
            }
        })
    }
}

/// Run a single tick for `plugin`, publishing to `group`
pub async fn tick(plugin: &Plugin, sink: &dyn PayloadSink, group: &str) -> TickOutcome {
    tracing::debug!(plugin = %plugin.name(), "Running producer");

    match invoke(plugin).await {
        None => {
            tracing::warn!(plugin = %plugin.name(), "Plugin has no producer, skipping");
            TickOutcome::NoProducer
        }
        Some(Ok(Some(payload))) => {
            tracing::debug!(plugin = %plugin.name(), group = %group, "Producer returned data");
            TickOutcome::Published(sink.publish(group, payload).await)
        }
        Some(Ok(None)) => {
            tracing::info!(plugin = %plugin.name(), "Producer returned nothing, skipping");
            TickOutcome::Empty
        }
        Some(Err(e)) => {
            tracing::error!(plugin = %plugin.name(), error = %e, "Producer failed");
            TickOutcome::Failed(e)
        }
    }
}

/// Call the producer on the blocking pool; `None` if the plugin has none
async fn invoke(plugin: &Plugin) -> Option<Result<Option<Payload>, ProduceError>> {
    let producer = Arc::clone(plugin.producer()?);
    let result = tokio::task::spawn_blocking(move || producer.produce())
        .await
        .unwrap_or_else(|e| Err(ProduceError::Panicked(e.to_string())));
    Some(result)
}

/// Handles of the running plugin tasks
///
/// Tasks run until the runtime shuts down; dropping the handle does not stop
/// them.
pub struct SchedulerHandle {
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl SchedulerHandle {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Abort every plugin task
    pub fn abort_all(&self) {
        for (_, task) in &self.tasks {
            task.abort();
        }
    }
}
