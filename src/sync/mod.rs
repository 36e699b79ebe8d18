// src/sync/mod.rs

//! Package synchronization between a source and a target suite
//!
//! For every source package of a component the engine looks up the target
//! package of the same name and decides:
//!
//! - absent downstream: NEW proposal
//! - older downstream: UPDATE proposal (or a merge-required issue if the
//!   target carries the distribution tag)
//! - newer downstream: merge-conflict issue, plus an UPDATE when forced
//! - equal: nothing
//!
//! Blacklisted names are neither proposed nor reported.

mod engine;
pub mod events;
mod issue;

pub use engine::{SyncEngine, SyncSourceInfo, TrustContext};
pub use events::{IssueEventData, SyncEvent};
pub use issue::{IssueKind, ProposalKind, SyncProposal, SyncResult, SynchrotronIssue};
