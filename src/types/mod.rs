//! Shared data types for the relay
//!
//! Small value types passed between the hub, the scheduler and the HTTP layer.

use serde::{Deserialize, Serialize};

/// Group a connection joins when its handshake names none
pub const DEFAULT_GROUP: &str = "default";

/// Payload handed from a producer to every member of a group
pub type Payload = serde_json::Value;

/// Outcome of a single fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub group: String,
    /// Members in the snapshot taken when the publish started
    pub attempted: usize,
    pub delivered: usize,
    /// Members removed because delivery failed
    pub dropped: usize,
    /// Members that left between the snapshot and their delivery
    pub skipped: usize,
}

impl PublishReport {
    /// Report for a publish that found no members
    pub fn empty(group: &str) -> Self {
        Self {
            group: group.to_string(),
            ..Default::default()
        }
    }
}

/// A group and its current member count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub members: usize,
}

/// Counters kept by the broadcast hub
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    pub groups: usize,
    /// Sum of member set sizes; a connection in two groups counts twice
    pub memberships: usize,
    pub publishes: u64,
    pub deliveries: u64,
    pub dropped: u64,
}

/// Description of a loaded plugin for the status API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSummary {
    pub name: String,
    pub interval_secs: f64,
    pub target_group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}
