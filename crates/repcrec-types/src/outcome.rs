//! Result records produced by the transaction manager

use crate::ids::{SiteId, Timestamp, TxId, Value, VarId};
use crate::operation::OpKind;
use crate::transaction::TxKind;
use std::collections::BTreeMap;
use std::fmt;

/// Site availability
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SiteStatus {
    /// Serving reads and writes
    Up,
    /// Failed
    Down,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::Up => write!(f, "up"),
            SiteStatus::Down => write!(f, "down"),
        }
    }
}

/// Why a transaction was aborted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AbortReason {
    /// Chosen as victim of a wait-for cycle
    Deadlock,
    /// Accessed a site that failed before END
    SiteFailure,
    /// Read-only transaction with no site able to serve its snapshot
    NoDataForReadOnly,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Deadlock => write!(f, "deadlock"),
            AbortReason::SiteFailure => write!(f, "site failure"),
            AbortReason::NoDataForReadOnly => {
                write!(f, "read-only, no data available in sites to read")
            }
        }
    }
}

/// A value returned by a READ
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadResult {
    /// Reading transaction
    pub tx: TxId,
    /// Site that served the read
    pub site: SiteId,
    /// Variable read
    pub var: VarId,
    /// Value read
    pub value: Value,
}

/// Committed state of one site
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiteDump {
    /// Site ID
    pub site: SiteId,
    /// Up or down
    pub status: SiteStatus,
    /// Latest committed value of every variable the site hosts
    pub values: BTreeMap<VarId, Value>,
}

/// Committed state of every site, in site order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DumpReport {
    /// One entry per site
    pub sites: Vec<SiteDump>,
}

impl DumpReport {
    /// Look up the dump of one site
    pub fn site(&self, site: SiteId) -> Option<&SiteDump> {
        self.sites.iter().find(|dump| dump.site == site)
    }
}

/// What happened to one operation
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum Outcome {
    /// A transaction started
    Began {
        /// Started transaction
        tx: TxId,
        /// Its kind
        kind: TxKind,
    },
    /// A read completed
    Read(ReadResult),
    /// A write acquired its locks and was buffered
    Written {
        /// Writing transaction
        tx: TxId,
        /// Variable written
        var: VarId,
        /// Sites holding the buffered value
        sites: Vec<SiteId>,
    },
    /// A transaction committed
    Committed {
        /// Committed transaction
        tx: TxId,
    },
    /// A transaction aborted
    Aborted {
        /// Aborted transaction
        tx: TxId,
        /// Why
        reason: AbortReason,
    },
    /// A site went down
    SiteFailed {
        /// Failed site
        site: SiteId,
    },
    /// A site came back up
    SiteRecovered {
        /// Recovered site
        site: SiteId,
    },
    /// Snapshot of committed state
    Dump(DumpReport),
    /// The operation cannot proceed yet and was queued
    Blocked {
        /// Queued operation
        op: OpKind,
    },
    /// The operation was invalid and dropped
    Rejected {
        /// Dropped operation
        op: OpKind,
        /// Why it was rejected
        reason: String,
    },
}

/// An outcome tagged with the logical time of the operation that produced it
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Time of the originating operation
    pub at: Timestamp,
    /// What happened
    pub outcome: Outcome,
}

impl Event {
    /// Create a new event
    pub fn new(at: Timestamp, outcome: Outcome) -> Self {
        Self { at, outcome }
    }
}
