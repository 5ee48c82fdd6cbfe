//! Transaction bookkeeping

use crate::ids::{Timestamp, TxId};
use crate::operation::Operation;

/// Transaction kind
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TxKind {
    /// Reads from a snapshot, never locks
    ReadOnly,
    /// Reads and writes under strict two-phase locking
    ReadWrite,
}

/// Transaction status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TxStatus {
    /// Running normally
    Active,
    /// Touched a site that later failed; aborts at END
    MarkedForAbort,
    /// Committed
    Committed,
    /// Aborted
    Aborted,
}

/// A live transaction
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction ID
    pub id: TxId,
    /// Logical time of its BEGIN
    pub start_time: Timestamp,
    /// Read-only or read-write
    pub kind: TxKind,
    /// Current status
    pub status: TxStatus,
    /// Operations issued so far, for diagnostics
    pub log: Vec<Operation>,
}

impl Transaction {
    /// Create a new active transaction
    pub fn new(id: TxId, start_time: Timestamp, kind: TxKind) -> Self {
        Self {
            id,
            start_time,
            kind,
            status: TxStatus::Active,
            log: Vec::new(),
        }
    }

    /// Whether this is a read-only transaction
    pub fn is_read_only(&self) -> bool {
        self.kind == TxKind::ReadOnly
    }

    /// Whether a site failure has doomed this transaction
    pub fn is_marked_for_abort(&self) -> bool {
        self.status == TxStatus::MarkedForAbort
    }

    /// Flag the transaction to abort at END
    pub fn mark_for_abort(&mut self) {
        if self.status == TxStatus::Active {
            self.status = TxStatus::MarkedForAbort;
        }
    }

    /// Append an operation to the diagnostic log
    pub fn record(&mut self, op: Operation) {
        self.log.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OpKind;

    #[test]
    fn test_new_transaction_is_active() {
        let tx = Transaction::new(TxId::new(1), 5, TxKind::ReadWrite);
        assert_eq!(tx.status, TxStatus::Active);
        assert!(!tx.is_read_only());
        assert!(tx.log.is_empty());
    }

    #[test]
    fn test_mark_for_abort() {
        let mut tx = Transaction::new(TxId::new(1), 1, TxKind::ReadWrite);
        tx.mark_for_abort();
        assert!(tx.is_marked_for_abort());

        // Marking twice keeps the mark
        tx.mark_for_abort();
        assert_eq!(tx.status, TxStatus::MarkedForAbort);
    }

    #[test]
    fn test_record_keeps_order() {
        let mut tx = Transaction::new(TxId::new(2), 1, TxKind::ReadOnly);
        tx.record(Operation::new(2, OpKind::End { tx: TxId::new(2) }));
        tx.record(Operation::new(3, OpKind::Dump));
        assert!(tx.is_read_only());
        assert_eq!(tx.log.len(), 2);
        assert_eq!(tx.log[0].at, 2);
    }
}
