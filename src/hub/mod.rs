//! Group based broadcast hub
//!
//! Owns the group → member table. Connections join groups after their
//! handshake, leave every group when they close, and receive payloads
//! published to any group they belong to.
//!
//! # Concurrency
//!
//! The table sits behind a single `parking_lot::Mutex` that is never held
//! across an await point. Publishing takes a snapshot of the member set under
//! the lock and delivers outside it, so joins and leaves that race a fan-out
//! only ever touch the table, never the snapshot being iterated. The hub is
//! `Send + Sync` and may be called from any thread or runtime.

mod connection;
mod sink;

pub use connection::{ConnectionHandle, ConnectionId, Outbound};
pub use sink::PayloadSink;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;

use crate::types::{GroupSummary, HubStats, Payload, PublishReport};

/// Default upper bound on how long one member may hold up a fan-out
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

type MemberSet = HashMap<ConnectionId, ConnectionHandle>;

enum Delivery {
    Delivered,
    Skipped,
    Failed,
}

/// Group membership table with fan-out publishing
pub struct BroadcastHub {
    /// Invariant: every entry has a non-empty member set
    groups: Mutex<HashMap<String, MemberSet>>,

    delivery_timeout: Duration,

    publishes: AtomicU64,
    deliveries: AtomicU64,
    dropped: AtomicU64,
}

impl BroadcastHub {
    /// Create an empty hub with the default delivery timeout
    pub fn new() -> Self {
        Self::with_delivery_timeout(DEFAULT_DELIVERY_TIMEOUT)
    }

    /// Create an empty hub with a custom per-member delivery timeout
    pub fn with_delivery_timeout(delivery_timeout: Duration) -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            delivery_timeout,
            publishes: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    /// Add a connection to a group, creating the group if needed
    ///
    /// Returns false if the connection was already a member or has been
    /// evicted. Joining a second group keeps the first membership.
    pub fn join(&self, conn: &ConnectionHandle, group: &str) -> bool {
        if conn.is_evicted() {
            tracing::debug!(conn = conn.id(), group = %group, "Evicted client cannot join");
            return false;
        }
        let mut groups = self.groups.lock();
        let members = groups.entry(group.to_string()).or_default();
        let added = members.insert(conn.id(), conn.clone()).is_none();
        let size = members.len();
        drop(groups);

        if added {
            tracing::info!(conn = conn.id(), group = %group, members = size, "Client joined group");
        } else {
            tracing::debug!(conn = conn.id(), group = %group, "Client already in group");
        }
        added
    }

    /// Remove a connection from every group it belongs to
    ///
    /// Groups left empty are deleted. Returns the names of the groups the
    /// connection was removed from.
    pub fn leave(&self, id: ConnectionId) -> Vec<String> {
        let mut left = Vec::new();
        {
            let mut groups = self.groups.lock();
            groups.retain(|name, members| {
                if members.remove(&id).is_some() {
                    left.push(name.clone());
                }
                !members.is_empty()
            });
        }

        if !left.is_empty() {
            left.sort();
            tracing::info!(conn = id, groups = ?left, "Client left groups");
        }
        left
    }

    /// Deliver a payload to every current member of a group
    ///
    /// Never fails: a group without members is a logged no-op and members
    /// whose delivery fails are dropped from the table and evicted while the
    /// remaining deliveries continue. A snapshot member that is no longer in
    /// the group once its queue has room is skipped.
    pub async fn publish(&self, group: &str, payload: &Payload) -> PublishReport {
        let snapshot: Vec<ConnectionHandle> = match self.groups.lock().get(group) {
            Some(members) => members.values().cloned().collect(),
            None => {
                tracing::warn!(group = %group, "Group not found, nothing to publish");
                return PublishReport::empty(group);
            }
        };

        let message: Outbound = match serde_json::to_string(payload) {
            Ok(text) => text.into(),
            Err(e) => {
                tracing::error!(group = %group, error = %e, "Failed to serialize payload");
                return PublishReport::empty(group);
            }
        };

        self.publishes.fetch_add(1, Ordering::Relaxed);

        let deliveries = snapshot.iter().map(|conn| {
            let message = message.clone();
            async move {
                // Left after the snapshot was taken
                if !self.is_member(group, conn.id()) {
                    return Delivery::Skipped;
                }
                match conn.reserve(self.delivery_timeout).await {
                    // Membership may have changed while waiting for room
                    Ok(_) if !self.is_member(group, conn.id()) => Delivery::Skipped,
                    Ok(permit) => {
                        permit.send(message);
                        Delivery::Delivered
                    }
                    // Already removed by its own close or an earlier failure
                    Err(_) if !self.is_member(group, conn.id()) => Delivery::Skipped,
                    Err(e) => {
                        tracing::warn!(
                            conn = conn.id(),
                            peer = ?conn.peer(),
                            group = %group,
                            error = %e,
                            "Delivery failed, removing client"
                        );
                        self.leave(conn.id());
                        conn.evict();
                        Delivery::Failed
                    }
                }
            }
        });

        let mut report = PublishReport {
            group: group.to_string(),
            attempted: snapshot.len(),
            ..Default::default()
        };
        for outcome in join_all(deliveries).await {
            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Skipped => report.skipped += 1,
                Delivery::Failed => report.dropped += 1,
            }
        }

        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.dropped.fetch_add(report.dropped as u64, Ordering::Relaxed);

        tracing::debug!(
            group = %group,
            attempted = report.attempted,
            delivered = report.delivered,
            skipped = report.skipped,
            dropped = report.dropped,
            "Published to group"
        );
        report
    }

    /// Check whether a connection is currently in a group
    pub fn is_member(&self, group: &str, id: ConnectionId) -> bool {
        self.groups
            .lock()
            .get(group)
            .is_some_and(|members| members.contains_key(&id))
    }

    /// Number of members in a group (0 if the group does not exist)
    pub fn member_count(&self, group: &str) -> usize {
        self.groups.lock().get(group).map_or(0, |members| members.len())
    }

    /// Whether a group currently exists
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.lock().contains_key(group)
    }

    /// Groups a connection belongs to, sorted by name
    pub fn groups_of(&self, id: ConnectionId) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .lock()
            .iter()
            .filter(|(_, members)| members.contains_key(&id))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Snapshot of all groups, sorted by name
    pub fn groups(&self) -> Vec<GroupSummary> {
        let mut summaries: Vec<GroupSummary> = self
            .groups
            .lock()
            .iter()
            .map(|(name, members)| GroupSummary {
                name: name.clone(),
                members: members.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn stats(&self) -> HubStats {
        let (groups, memberships) = {
            let table = self.groups.lock();
            (table.len(), table.values().map(|m| m.len()).sum())
        };
        HubStats {
            groups,
            memberships,
            publishes: self.publishes.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
