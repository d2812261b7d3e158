use rw_schemas::{CopyId, CopyStatus, GameId, RentalId, RentalKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed taxonomy of drift between `game_copies.status` and open rentals.
/// New incident types extend this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    OrphanedReservation,
    DuplicateOpenRental,
    StatusMismatch,
    PhantomOpenRental,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::OrphanedReservation => "ORPHANED_RESERVATION",
            ViolationKind::DuplicateOpenRental => "DUPLICATE_OPEN_RENTAL",
            ViolationKind::StatusMismatch => "STATUS_MISMATCH",
            ViolationKind::PhantomOpenRental => "PHANTOM_OPEN_RENTAL",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence of one mismatch, keyed by copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    /// Status is RESERVED/RENTED but no open rental references the copy.
    OrphanedReservation {
        copy_id: CopyId,
        game_id: GameId,
        status: CopyStatus,
    },

    /// More than one open rental references the copy.
    DuplicateOpenRental {
        copy_id: CopyId,
        game_id: GameId,
        status: CopyStatus,
        /// Most recent `borrowed_at`; higher rental id on ties.
        kept: RentalId,
        /// All other open rentals, ascending.
        redundant: Vec<RentalId>,
    },

    /// Exactly one open rental, but its kind disagrees with the status.
    StatusMismatch {
        copy_id: CopyId,
        game_id: GameId,
        status: CopyStatus,
        rental_id: RentalId,
        rental_kind: RentalKind,
    },

    /// Copy is AVAILABLE yet still referenced by open rentals.
    PhantomOpenRental {
        copy_id: CopyId,
        game_id: GameId,
        rental_ids: Vec<RentalId>,
    },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::OrphanedReservation { .. } => ViolationKind::OrphanedReservation,
            Violation::DuplicateOpenRental { .. } => ViolationKind::DuplicateOpenRental,
            Violation::StatusMismatch { .. } => ViolationKind::StatusMismatch,
            Violation::PhantomOpenRental { .. } => ViolationKind::PhantomOpenRental,
        }
    }

    pub fn copy_id(&self) -> CopyId {
        match self {
            Violation::OrphanedReservation { copy_id, .. }
            | Violation::DuplicateOpenRental { copy_id, .. }
            | Violation::StatusMismatch { copy_id, .. }
            | Violation::PhantomOpenRental { copy_id, .. } => *copy_id,
        }
    }

    pub fn game_id(&self) -> GameId {
        match self {
            Violation::OrphanedReservation { game_id, .. }
            | Violation::DuplicateOpenRental { game_id, .. }
            | Violation::StatusMismatch { game_id, .. }
            | Violation::PhantomOpenRental { game_id, .. } => *game_id,
        }
    }

    /// One-line human summary, used by the text renderer and log lines.
    pub fn describe(&self) -> String {
        match self {
            Violation::OrphanedReservation { copy_id, status, .. } => {
                format!("copy {copy_id} is {status} with no open rental")
            }
            Violation::DuplicateOpenRental {
                copy_id,
                kept,
                redundant,
                ..
            } => format!(
                "copy {copy_id} has {} open rentals (kept={kept} redundant={redundant:?})",
                redundant.len() + 1
            ),
            Violation::StatusMismatch {
                copy_id,
                status,
                rental_id,
                rental_kind,
                ..
            } => format!("copy {copy_id} is {status} but open rental {rental_id} is {rental_kind}"),
            Violation::PhantomOpenRental {
                copy_id,
                rental_ids,
                ..
            } => format!("copy {copy_id} is AVAILABLE but open rentals {rental_ids:?} reference it"),
        }
    }
}
