//! rw-reconcile
//!
//! Consistency checker for the copy/rental inventory.
//!
//! Rules:
//! - A non-AVAILABLE copy with no open rental is an orphaned reservation
//! - A copy with more than one open rental is a duplicate
//! - A single open rental whose kind disagrees with the copy status is a mismatch
//! - An AVAILABLE copy that an open rental still references is a phantom
//!
//! Deterministic, pure logic. No IO. No store calls.

mod engine;
mod overdue;
mod types;

pub use engine::{check_copy, dangling_rentals, find_violations, is_consistent};
pub use overdue::{find_expired_dibs, find_overdue, ExpiredDibs, OverdueRental};
pub use types::*;
