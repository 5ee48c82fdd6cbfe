//! # repcrec-scheduler
//!
//! Transaction processing for the replicated store.
//!
//! This crate provides:
//! - The [`TransactionManager`], which dispatches operations to sites and
//!   drives the execute / retry / deadlock-check cycle
//! - Strict two-phase locking with the available-copies protocol
//! - Snapshot reads for read-only transactions
//! - Wait-for graph deadlock detection ([`DeadlockDetector`])
//! - A thread-safe handle serializing submissions ([`SharedTransactionManager`])
//!
//! ## Usage
//!
//! ```
//! use repcrec_scheduler::TransactionManager;
//! use repcrec_types::{OpKind, Operation, SimConfig, TxId, VarId};
//!
//! let mut tm = TransactionManager::new(SimConfig::default());
//! let t1 = TxId::new(1);
//! tm.submit(Operation::new(1, OpKind::Begin { tx: t1 }));
//! let events = tm.submit(Operation::new(2, OpKind::Read { tx: t1, var: VarId::new(2) }));
//! assert_eq!(events.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod deadlock;
mod error;
mod manager;
mod shared;

pub use deadlock::{select_victim, Access, DeadlockDetector};
pub use error::{SchedulerError, SchedulerResult};
pub use manager::TransactionManager;
pub use shared::SharedTransactionManager;
