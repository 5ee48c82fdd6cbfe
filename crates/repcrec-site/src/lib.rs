//! # repcrec-site
//!
//! A single site of the replicated store.
//!
//! This crate provides:
//! - Versioned variables with read availability ([`Variable`])
//! - Strict two-phase lock table ([`LockManager`])
//! - Committed histories and uncommitted write buffers ([`DataManager`])
//! - Site status, failure/recovery and read-only snapshots ([`Site`])
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------+
//! |                 Site                  |
//! +---------------------------------------+
//! |  LockManager  |  DataManager  | Snaps |
//! |  var -> locks | var -> hist   | t ->  |
//! |               | tx -> buffer  | {x:v} |
//! +---------------------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod data_manager;
mod lock_manager;
mod site;
mod variable;

pub use data_manager::DataManager;
pub use lock_manager::{LockEntry, LockManager};
pub use site::Site;
pub use variable::Variable;
