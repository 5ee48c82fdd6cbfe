//! Thread-safe handle around the transaction manager

use crate::manager::TransactionManager;
use parking_lot::Mutex;
use repcrec_types::{Event, OpKind, Operation, SimConfig};
use std::sync::Arc;

/// Cloneable handle that serializes submissions from many threads
///
/// Operations are processed one at a time under a single lock, so the
/// simulation stays sequential no matter how many producers feed it.
#[derive(Clone, Debug)]
pub struct SharedTransactionManager {
    inner: Arc<Mutex<TransactionManager>>,
}

impl SharedTransactionManager {
    /// Create a handle over a fresh manager
    pub fn new(config: SimConfig) -> Self {
        Self::from_manager(TransactionManager::new(config))
    }

    /// Wrap an existing manager
    pub fn from_manager(manager: TransactionManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Submit an operation with an explicit timestamp
    pub fn submit(&self, op: Operation) -> Vec<Event> {
        self.inner.lock().submit(op)
    }

    /// Submit an operation stamped one tick after the last accepted one
    ///
    /// The timestamp is assigned under the lock, so concurrent callers never
    /// collide.
    pub fn submit_next(&self, kind: OpKind) -> Vec<Event> {
        let mut manager = self.inner.lock();
        let at = manager.now() + 1;
        manager.submit(Operation::new(at, kind))
    }

    /// Drain the blocked queue
    pub fn finish(&self) -> Vec<Event> {
        self.inner.lock().finish()
    }

    /// Run a closure with exclusive access to the manager
    pub fn with<R>(&self, f: impl FnOnce(&mut TransactionManager) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
