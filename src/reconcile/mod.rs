//! Reconciliation — turns a session's pending changes into remote calls.
//!
//! - `plan`: the pure diff between snapshot and working copy
//! - `engine`: executes a plan against a `RemoteStore`
//! - `outcome`: the per-item report of one save

pub mod engine;
pub mod outcome;
pub mod plan;

pub use engine::{ReconcileEngine, DEFAULT_MAX_IN_FLIGHT};
pub use outcome::{OperationFailure, OperationRecord, SaveReport, SaveStatus};
pub use plan::{plan, OperationKind, SavePlan, UpsertKind};
