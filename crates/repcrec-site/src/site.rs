//! A site: lock table, data, snapshots and up/down status

use crate::data_manager::DataManager;
use crate::lock_manager::LockManager;
use repcrec_types::{SimConfig, SiteDump, SiteId, SiteStatus, Timestamp, Value, VarId};
use std::collections::BTreeMap;

/// One site of the replicated store
#[derive(Debug)]
pub struct Site {
    id: SiteId,
    status: SiteStatus,
    data: DataManager,
    locks: LockManager,
    /// Read-only snapshots keyed by the reader's start time
    snapshots: BTreeMap<Timestamp, BTreeMap<VarId, Value>>,
}

impl Site {
    /// Create an up site holding initial values
    pub fn new(id: SiteId, config: &SimConfig) -> Self {
        Self {
            id,
            status: SiteStatus::Up,
            data: DataManager::new(id, config),
            locks: LockManager::new(),
            snapshots: BTreeMap::new(),
        }
    }

    /// Site ID
    pub fn id(&self) -> SiteId {
        self.id
    }

    /// Current status
    pub fn status(&self) -> SiteStatus {
        self.status
    }

    /// Whether the site is up
    pub fn is_up(&self) -> bool {
        self.status == SiteStatus::Up
    }

    /// Data manager
    pub fn data(&self) -> &DataManager {
        &self.data
    }

    /// Mutable data manager
    pub fn data_mut(&mut self) -> &mut DataManager {
        &mut self.data
    }

    /// Lock manager
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Mutable lock manager
    pub fn locks_mut(&mut self) -> &mut LockManager {
        &mut self.locks
    }

    /// Take the site down: locks and uncommitted writes are lost
    pub fn fail(&mut self) {
        self.status = SiteStatus::Down;
        self.locks.clear();
        self.data.fail();
        tracing::info!("site {} failed", self.id);
    }

    /// Bring the site back up
    pub fn recover(&mut self) {
        self.status = SiteStatus::Up;
        self.data.recover();
        tracing::info!("site {} recovered", self.id);
    }

    /// Freeze the committed value of every available variable under `time`
    pub fn capture_snapshot(&mut self, time: Timestamp) {
        let values = self.data.available_values();
        tracing::debug!(site = %self.id, time, vars = values.len(), "snapshot captured");
        self.snapshots.insert(time, values);
    }

    /// Whether a snapshot was captured at `time`
    pub fn has_snapshot(&self, time: Timestamp) -> bool {
        self.snapshots.contains_key(&time)
    }

    /// Value of `var` in the snapshot taken at `time`
    pub fn snapshot_value(&self, time: Timestamp, var: VarId) -> Option<Value> {
        self.snapshots
            .get(&time)
            .and_then(|values| values.get(&var))
            .copied()
    }

    /// Discard the snapshot taken at `time`
    pub fn drop_snapshot(&mut self, time: Timestamp) -> bool {
        self.snapshots.remove(&time).is_some()
    }

    /// Status and committed values for a dump
    pub fn dump(&self) -> SiteDump {
        SiteDump {
            site: self.id,
            status: self.status,
            values: self.data.committed_values(),
        }
    }
}
