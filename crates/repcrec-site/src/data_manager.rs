//! Committed data and uncommitted write buffers of one site

use crate::variable::Variable;
use repcrec_types::{SimConfig, SiteId, Timestamp, TxId, Value, VarId};
use std::collections::BTreeMap;

/// Data manager for one site
///
/// Owns the copies of every variable the site hosts and, per transaction,
/// the values written but not yet committed here.
#[derive(Debug)]
pub struct DataManager {
    variables: BTreeMap<VarId, Variable>,
    /// Uncommitted writes: tx -> (var -> value)
    uncommitted: BTreeMap<TxId, BTreeMap<VarId, Value>>,
}

impl DataManager {
    /// Create the data manager of `site`, populated with initial values
    pub fn new(site: SiteId, config: &SimConfig) -> Self {
        let variables = config
            .var_ids()
            .filter(|var| config.hosts(site, *var))
            .map(|var| {
                let copy = Variable::new(var, config.is_replicated(var), config.initial_value(var));
                (var, copy)
            })
            .collect();

        Self {
            variables,
            uncommitted: BTreeMap::new(),
        }
    }

    /// Whether this site holds a copy of `var`
    pub fn hosts(&self, var: VarId) -> bool {
        self.variables.contains_key(&var)
    }

    /// The local copy of `var`
    pub fn variable(&self, var: VarId) -> Option<&Variable> {
        self.variables.get(&var)
    }

    /// Whether `var` is hosted here and readable by read-write transactions
    pub fn is_available(&self, var: VarId) -> bool {
        self.variables
            .get(&var)
            .map(Variable::is_available)
            .unwrap_or(false)
    }

    /// Latest committed value of `var`
    pub fn current_value(&self, var: VarId) -> Option<Value> {
        self.variables.get(&var).map(Variable::current_value)
    }

    /// Value `tx_id` has written to `var` here but not committed
    pub fn buffered(&self, tx_id: TxId, var: VarId) -> Option<Value> {
        self.uncommitted
            .get(&tx_id)
            .and_then(|writes| writes.get(&var))
            .copied()
    }

    /// Value `tx_id` sees for `var`: its own write if any, else the committed value
    pub fn read(&self, tx_id: TxId, var: VarId) -> Option<Value> {
        self.buffered(tx_id, var).or_else(|| self.current_value(var))
    }

    /// Buffer an uncommitted write
    pub fn buffer_write(&mut self, tx_id: TxId, var: VarId, value: Value) {
        self.uncommitted.entry(tx_id).or_default().insert(var, value);
    }

    /// Whether `tx_id` has any uncommitted write here
    pub fn has_buffer(&self, tx_id: TxId) -> bool {
        self.uncommitted.contains_key(&tx_id)
    }

    /// Move `tx_id`'s buffered writes into committed history at `now`
    ///
    /// Every written variable becomes available again. Returns the written
    /// variables in order.
    pub fn commit(&mut self, tx_id: TxId, now: Timestamp) -> Vec<VarId> {
        let Some(writes) = self.uncommitted.remove(&tx_id) else {
            return Vec::new();
        };

        let mut committed = Vec::with_capacity(writes.len());
        for (var, value) in writes {
            if let Some(copy) = self.variables.get_mut(&var) {
                copy.commit(now, value);
                copy.set_available(true);
                committed.push(var);
            }
        }
        committed
    }

    /// Drop `tx_id`'s buffered writes without touching history
    pub fn revert(&mut self, tx_id: TxId) {
        self.uncommitted.remove(&tx_id);
    }

    /// Clear all buffers and make every copy unavailable
    pub fn fail(&mut self) {
        self.uncommitted.clear();
        for copy in self.variables.values_mut() {
            copy.set_available(false);
        }
    }

    /// Non-replicated copies become available; replicated copies wait for a commit
    pub fn recover(&mut self) {
        for copy in self.variables.values_mut() {
            copy.set_available(!copy.is_replicated());
        }
    }

    /// Latest committed value of every hosted variable
    pub fn committed_values(&self) -> BTreeMap<VarId, Value> {
        self.variables
            .iter()
            .map(|(var, copy)| (*var, copy.current_value()))
            .collect()
    }

    /// Latest committed value of every currently available variable
    pub fn available_values(&self) -> BTreeMap<VarId, Value> {
        self.variables
            .iter()
            .filter(|(_, copy)| copy.is_available())
            .map(|(var, copy)| (*var, copy.current_value()))
            .collect()
    }
}
