//! rw-repair
//!
//! Repair orchestration for the inventory reconciliation pass.
//!
//! Flow per pass: schema probe -> read -> check -> repair -> re-check.
//! The store and the transition procedures are injected through the
//! [`StateReader`] and [`TransitionRpc`] traits; this crate never writes to the
//! store directly.

mod orchestrator;
mod pass;
mod plan;
pub mod ports;
pub mod render;
mod report;

pub use orchestrator::{RepairOptions, RepairOrchestrator, MAX_WORKERS};
pub use pass::{run_pass, PassOptions, PassReport};
pub use plan::plan_action;
pub use ports::{
    interpret_procedure_reply, CopySnapshot, RpcError, StateReader, StoreError, TransitionRpc,
};
pub use report::{Outcome, RepairAction, RepairCounts, RepairFailure, RepairItem, RepairReport};
