//! Error types for the scheduler

use repcrec_types::{SiteId, Timestamp, TxId, VarId};
use thiserror::Error;

/// Scheduler errors
///
/// Every variant marks an invalid operation: it is reported and dropped,
/// never queued, and the simulation continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Transaction not found (never started or already finished)
    #[error("transaction {0} does not exist")]
    UnknownTransaction(TxId),

    /// BEGIN for a transaction that is still live
    #[error("transaction {0} already exists")]
    DuplicateTransaction(TxId),

    /// Write issued by a read-only transaction
    #[error("read-only transaction {0} cannot write")]
    ReadOnlyWrite(TxId),

    /// Variable outside the configured range
    #[error("variable {0} does not exist")]
    UnknownVariable(VarId),

    /// Site outside the configured range
    #[error("site {0} does not exist")]
    UnknownSite(SiteId),

    /// Operation time not after the previous one
    #[error("logical time {got} is not after {previous}")]
    NonMonotonicTime {
        /// Time of the previous submission
        previous: Timestamp,
        /// Offending time
        got: Timestamp,
    },
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
