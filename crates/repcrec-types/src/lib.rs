//! # repcrec-types
//!
//! Core types shared by every RepCRec crate.
//!
//! This crate provides:
//! - Identifiers for transactions, variables and sites
//! - The immutable simulation configuration ([`SimConfig`])
//! - Operation records fed to the transaction manager
//! - Transaction bookkeeping
//! - Result records ([`Event`], [`Outcome`], [`DumpReport`])

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod ids;
mod operation;
mod outcome;
mod transaction;

pub use config::{ConfigError, SimConfig, DEFAULT_NUM_SITES, DEFAULT_NUM_VARIABLES};
pub use ids::{SiteId, Timestamp, TxId, Value, VarId};
pub use operation::{OpKind, Operation};
pub use outcome::{AbortReason, DumpReport, Event, Outcome, ReadResult, SiteDump, SiteStatus};
pub use transaction::{Transaction, TxKind, TxStatus};
