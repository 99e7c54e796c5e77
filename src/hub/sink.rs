//! Seam between payload producers and the broadcast hub

use async_trait::async_trait;

use super::BroadcastHub;
use crate::types::{Payload, PublishReport};

/// Anything that can take a payload addressed to a group
///
/// The scheduler publishes through this trait so it never depends on hub
/// internals.
#[async_trait]
pub trait PayloadSink: Send + Sync {
    async fn publish(&self, group: &str, payload: Payload) -> PublishReport;
}

#[async_trait]
impl PayloadSink for BroadcastHub {
    async fn publish(&self, group: &str, payload: Payload) -> PublishReport {
        BroadcastHub::publish(self, group, &payload).await
    }
}
