//! Channel directory: which slots currently have a host.
//!
//! The directory is a concurrent map from slot to ChannelStatus, seeded with
//! one vacant entry per slot and never holding more than one entry for a
//! slot. It is written by the discovery scanner and read by anyone holding a
//! clone. Observers can subscribe to full snapshots.
//!
//! Under `DirectoryPolicy::Accumulate` a slot only ever moves to active: a
//! host that leaves between scans keeps showing as live. `Reconcile` clears
//! slots that stayed silent for a whole cycle.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::watch;

use trx_core::config::DirectoryPolicy;
use trx_core::wire::{DiscoveryInfo, Slot};

/// What the directory knows about one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub slot_id: Slot,
    pub is_active: bool,
    /// Host-chosen display name, or the slot's default name while vacant.
    pub name: String,
    pub host_name: Option<String>,
}

impl ChannelStatus {
    /// The entry a slot shows while nobody is known to host it.
    pub fn vacant(slot: Slot) -> Self {
        Self {
            slot_id: slot,
            is_active: false,
            name: slot.default_name(),
            host_name: None,
        }
    }
}

/// The channel directory, shared between the scanner and its readers.
#[derive(Clone)]
pub struct ChannelDirectory {
    entries: Arc<DashMap<Slot, ChannelStatus>>,
    /// Slots that produced a pong during the current cycle.
    seen: Arc<DashSet<Slot>>,
    policy: DirectoryPolicy,
    updates: Arc<watch::Sender<Vec<ChannelStatus>>>,
}

impl ChannelDirectory {
    pub fn new(policy: DirectoryPolicy) -> Self {
        let entries = DashMap::new();
        for slot in Slot::all() {
            entries.insert(slot, ChannelStatus::vacant(slot));
        }
        let (updates, _) = watch::channel(Slot::all().map(ChannelStatus::vacant).collect());

        Self {
            entries: Arc::new(entries),
            seen: Arc::new(DashSet::new()),
            policy,
            updates: Arc::new(updates),
        }
    }

    pub fn policy(&self) -> DirectoryPolicy {
        self.policy
    }

    /// Mark the start of a scan cycle.
    pub fn begin_cycle(&self) {
        self.seen.clear();
    }

    /// Fold one pong into the directory.
    pub fn merge(&self, info: &DiscoveryInfo) {
        self.seen.insert(info.slot_id);

        let next = ChannelStatus {
            slot_id: info.slot_id,
            is_active: true,
            name: info.name.clone(),
            host_name: Some(info.host_name.clone()),
        };

        let changed = match self.entries.get_mut(&info.slot_id) {
            Some(mut entry) if *entry != next => {
                *entry = next;
                true
            }
            Some(_) => false,
            None => {
                self.entries.insert(info.slot_id, next);
                true
            }
        };

        if changed {
            tracing::debug!(
                slot = %info.slot_id,
                name = %info.name,
                host = %info.host_name,
                "channel discovered"
            );
            self.publish();
        }
    }

    /// Mark the end of a scan cycle. Under `Reconcile`, slots that stayed
    /// silent revert to vacant. Returns the slots that were cleared.
    pub fn end_cycle(&self) -> Vec<Slot> {
        if self.policy == DirectoryPolicy::Accumulate {
            return Vec::new();
        }

        let mut cleared = Vec::new();
        for mut entry in self.entries.iter_mut() {
            let slot = *entry.key();
            if entry.is_active && !self.seen.contains(&slot) {
                *entry = ChannelStatus::vacant(slot);
                cleared.push(slot);
            }
        }

        if !cleared.is_empty() {
            cleared.sort();
            tracing::debug!(slots = ?cleared, "silent channels cleared");
            self.publish();
        }
        cleared
    }

    pub fn get(&self, slot: Slot) -> ChannelStatus {
        self.entries
            .get(&slot)
            .map(|e| e.clone())
            .unwrap_or_else(|| ChannelStatus::vacant(slot))
    }

    /// All entries ordered by slot.
    pub fn snapshot(&self) -> Vec<ChannelStatus> {
        let mut all: Vec<ChannelStatus> = self.entries.iter().map(|e| e.clone()).collect();
        all.sort_by_key(|s| s.slot_id);
        all
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active).count()
    }

    /// Receive a fresh snapshot whenever an entry changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ChannelStatus>> {
        self.updates.subscribe()
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}
