//! Operation records fed to the transaction manager

use crate::ids::{SiteId, Timestamp, TxId, Value, VarId};
use std::fmt;

/// What an operation does, with exactly the fields each kind needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
pub enum OpKind {
    /// Start a read-write transaction
    Begin {
        /// Transaction being started
        tx: TxId,
    },
    /// Start a read-only transaction
    BeginRo {
        /// Transaction being started
        tx: TxId,
    },
    /// Read a variable
    Read {
        /// Reading transaction
        tx: TxId,
        /// Variable read
        var: VarId,
    },
    /// Write a variable
    Write {
        /// Writing transaction
        tx: TxId,
        /// Variable written
        var: VarId,
        /// New value
        value: Value,
    },
    /// Commit (or abort, if marked) a transaction
    End {
        /// Finishing transaction
        tx: TxId,
    },
    /// Take a site down
    Fail {
        /// Failing site
        site: SiteId,
    },
    /// Bring a site back up
    Recover {
        /// Recovering site
        site: SiteId,
    },
    /// Report every site's committed state
    Dump,
}

impl OpKind {
    /// Transaction this operation belongs to, if any
    pub fn tx(&self) -> Option<TxId> {
        match *self {
            OpKind::Begin { tx }
            | OpKind::BeginRo { tx }
            | OpKind::Read { tx, .. }
            | OpKind::Write { tx, .. }
            | OpKind::End { tx } => Some(tx),
            OpKind::Fail { .. } | OpKind::Recover { .. } | OpKind::Dump => None,
        }
    }

    /// Variable this operation touches, if any
    pub fn var(&self) -> Option<VarId> {
        match *self {
            OpKind::Read { var, .. } | OpKind::Write { var, .. } => Some(var),
            _ => None,
        }
    }

    /// Whether this is a data access (read or write)
    pub fn is_access(&self) -> bool {
        matches!(self, OpKind::Read { .. } | OpKind::Write { .. })
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Begin { tx } => write!(f, "begin({tx})"),
            OpKind::BeginRo { tx } => write!(f, "beginRO({tx})"),
            OpKind::Read { tx, var } => write!(f, "R({tx},{var})"),
            OpKind::Write { tx, var, value } => write!(f, "W({tx},{var},{value})"),
            OpKind::End { tx } => write!(f, "end({tx})"),
            OpKind::Fail { site } => write!(f, "fail({site})"),
            OpKind::Recover { site } => write!(f, "recover({site})"),
            OpKind::Dump => write!(f, "dump()"),
        }
    }
}

/// An immutable operation stamped with its logical time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operation {
    /// Logical time, strictly increasing across the input stream
    pub at: Timestamp,
    /// What the operation does
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: OpKind,
}

impl Operation {
    /// Create a new operation
    pub fn new(at: Timestamp, kind: OpKind) -> Self {
        Self { at, kind }
    }

    /// Transaction this operation belongs to, if any
    pub fn tx(&self) -> Option<TxId> {
        self.kind.tx()
    }

    /// Variable this operation touches, if any
    pub fn var(&self) -> Option<VarId> {
        self.kind.var()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{}", self.kind, self.at)
    }
}
