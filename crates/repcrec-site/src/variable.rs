//! A single copy of a variable at one site

use repcrec_types::{Timestamp, Value, VarId};
use std::collections::BTreeMap;

/// One site's copy of a variable
///
/// Keeps the full committed history keyed by commit time. The initial value
/// is recorded at time 0, before any operation of the stream.
#[derive(Clone, Debug)]
pub struct Variable {
    id: VarId,
    replicated: bool,
    history: BTreeMap<Timestamp, Value>,
    available: bool,
}

impl Variable {
    /// Create a variable holding its initial value
    pub fn new(id: VarId, replicated: bool, initial: Value) -> Self {
        Self {
            id,
            replicated,
            history: BTreeMap::from([(0, initial)]),
            available: true,
        }
    }

    /// Variable ID
    pub fn id(&self) -> VarId {
        self.id
    }

    /// Whether every site holds a copy
    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    /// Latest committed value
    pub fn current_value(&self) -> Value {
        self.history
            .last_key_value()
            .map(|(_, value)| *value)
            .unwrap_or_default()
    }

    /// Append a committed value
    pub fn commit(&mut self, time: Timestamp, value: Value) {
        self.history.insert(time, value);
    }

    /// Committed history, oldest first
    pub fn history(&self) -> &BTreeMap<Timestamp, Value> {
        &self.history
    }

    /// Whether read-write transactions may read this copy
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Set read availability
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value() {
        let var = Variable::new(VarId::new(2), true, 20);
        assert_eq!(var.current_value(), 20);
        assert!(var.is_available());
        assert!(var.is_replicated());
        assert_eq!(var.history().len(), 1);
    }

    #[test]
    fn test_commit_updates_current() {
        let mut var = Variable::new(VarId::new(3), false, 30);
        var.commit(5, 99);
        var.commit(9, 100);
        assert_eq!(var.current_value(), 100);
        assert_eq!(var.history().len(), 3);
    }

    #[test]
    fn test_availability_toggle() {
        let mut var = Variable::new(VarId::new(6), true, 60);
        var.set_available(false);
        assert!(!var.is_available());
        var.set_available(true);
        assert!(var.is_available());
    }
}
