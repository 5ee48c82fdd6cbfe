//! Lock table - tracks which transactions hold locks on each variable at a site

use repcrec_types::{TxId, VarId};
use std::collections::{BTreeMap, BTreeSet};

/// Holders of the locks on one variable
///
/// Readers and the writer are mutually exclusive, except that a transaction
/// holding the write lock may also read under it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockEntry {
    /// Transactions holding a shared lock
    pub readers: BTreeSet<TxId>,
    /// Transaction holding the exclusive lock
    pub writer: Option<TxId>,
}

impl LockEntry {
    fn is_empty(&self) -> bool {
        self.readers.is_empty() && self.writer.is_none()
    }

    fn remove(&mut self, tx_id: TxId) {
        self.readers.remove(&tx_id);
        if self.writer == Some(tx_id) {
            self.writer = None;
        }
    }
}

/// Lock table for one site
///
/// Locks are held until the owning transaction ends (strict 2PL); there is
/// no waiting here, a refused request returns the conflicting holder.
#[derive(Debug, Default)]
pub struct LockManager {
    /// Map from variable to its holders
    table: BTreeMap<VarId, LockEntry>,
}

impl LockManager {
    /// Create a new empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire a shared lock
    ///
    /// Returns `Ok(())` if granted or already covered by this tx's write lock.
    /// Returns `Err(writer)` if another transaction holds the write lock.
    pub fn acquire_read(&mut self, tx_id: TxId, var: VarId) -> Result<(), TxId> {
        let entry = self.table.entry(var).or_default();
        match entry.writer {
            Some(writer) if writer != tx_id => Err(writer),
            Some(_) => Ok(()),
            None => {
                entry.readers.insert(tx_id);
                Ok(())
            }
        }
    }

    /// Try to acquire an exclusive lock
    ///
    /// A sole reader may promote itself. Returns `Err(holder)` naming a
    /// transaction that blocks the request.
    pub fn acquire_write(&mut self, tx_id: TxId, var: VarId) -> Result<(), TxId> {
        self.check_write(tx_id, var)?;
        let entry = self.table.entry(var).or_default();
        entry.readers.clear();
        entry.writer = Some(tx_id);
        Ok(())
    }

    /// Check whether an exclusive lock would be granted, without taking it
    pub fn check_write(&self, tx_id: TxId, var: VarId) -> Result<(), TxId> {
        let Some(entry) = self.table.get(&var) else {
            return Ok(());
        };
        if let Some(writer) = entry.writer {
            if writer != tx_id {
                return Err(writer);
            }
        }
        match entry.readers.iter().find(|reader| **reader != tx_id) {
            Some(other) => Err(*other),
            None => Ok(()),
        }
    }

    /// Release every lock `tx_id` holds on `var`
    pub fn release(&mut self, tx_id: TxId, var: VarId) {
        if let Some(entry) = self.table.get_mut(&var) {
            entry.remove(tx_id);
            if entry.is_empty() {
                self.table.remove(&var);
            }
        }
    }

    /// Release all locks held by a transaction
    pub fn release_all(&mut self, tx_id: TxId) {
        self.table.retain(|_, entry| {
            entry.remove(tx_id);
            !entry.is_empty()
        });
    }

    /// Holders of locks on `var`, readers and writer together, sorted
    pub fn holders_of(&self, var: VarId) -> BTreeSet<TxId> {
        self.table
            .get(&var)
            .map(|entry| entry.readers.iter().copied().chain(entry.writer).collect())
            .unwrap_or_default()
    }

    /// Shared-lock holders of `var`
    pub fn read_holders(&self, var: VarId) -> BTreeSet<TxId> {
        self.table
            .get(&var)
            .map(|entry| entry.readers.clone())
            .unwrap_or_default()
    }

    /// Exclusive-lock holder of `var`
    pub fn write_holder(&self, var: VarId) -> Option<TxId> {
        self.table.get(&var).and_then(|entry| entry.writer)
    }

    /// Check if a transaction holds the write lock on `var`
    pub fn holds_write(&self, tx_id: TxId, var: VarId) -> bool {
        self.write_holder(var) == Some(tx_id)
    }

    /// Every transaction holding any lock at this site, sorted
    pub fn all_transactions(&self) -> BTreeSet<TxId> {
        self.table
            .values()
            .flat_map(|entry| entry.readers.iter().copied().chain(entry.writer))
            .collect()
    }

    /// Iterate over all non-empty lock entries
    pub fn entries(&self) -> impl Iterator<Item = (VarId, &LockEntry)> {
        self.table.iter().map(|(var, entry)| (*var, entry))
    }

    /// Number of variables with at least one holder
    pub fn len(&self) -> usize {
        self.table.values().filter(|entry| !entry.is_empty()).count()
    }

    /// Check if no locks are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every lock (site failure)
    pub fn clear(&mut self) {
        self.table.clear();
    }
}
