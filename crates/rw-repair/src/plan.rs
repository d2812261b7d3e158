use rw_reconcile::Violation;

use crate::RepairAction;

/// Map a violation to its single corrective action.
///
/// Orphans and phantoms are force-returned. Duplicates and kind mismatches
/// are left to an operator: picking the authoritative episode, or repairing a
/// half-finished DIBS->RENT conversion, needs context this layer lacks.
pub fn plan_action(v: &Violation) -> RepairAction {
    match v {
        Violation::OrphanedReservation { game_id, .. }
        | Violation::PhantomOpenRental { game_id, .. } => {
            RepairAction::ForceReturn { game_id: *game_id }
        }
        Violation::DuplicateOpenRental { .. } | Violation::StatusMismatch { .. } => {
            RepairAction::ManualReview
        }
    }
}

pub(crate) fn manual_review_reason(v: &Violation) -> String {
    match v {
        Violation::DuplicateOpenRental { kept, redundant, .. } => format!(
            "{} open rentals; cannot pick the authoritative episode (newest={kept}, redundant={redundant:?})",
            redundant.len() + 1
        ),
        Violation::StatusMismatch {
            status,
            rental_kind,
            ..
        } => format!(
            "status {status} with open {rental_kind}: upstream transition left the pair half-applied"
        ),
        other => format!("{} routed to manual review", other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_schemas::{CopyStatus, RentalKind};

    #[test]
    fn orphan_and_phantom_force_return_by_game() {
        let orphan = Violation::OrphanedReservation {
            copy_id: 1,
            game_id: 70,
            status: CopyStatus::Reserved,
        };
        let phantom = Violation::PhantomOpenRental {
            copy_id: 2,
            game_id: 71,
            rental_ids: vec![5],
        };
        assert_eq!(plan_action(&orphan), RepairAction::ForceReturn { game_id: 70 });
        assert_eq!(plan_action(&phantom), RepairAction::ForceReturn { game_id: 71 });
    }

    #[test]
    fn duplicate_and_mismatch_go_to_manual_review() {
        let dup = Violation::DuplicateOpenRental {
            copy_id: 3,
            game_id: 1,
            status: CopyStatus::Reserved,
            kept: 11,
            redundant: vec![10],
        };
        let mismatch = Violation::StatusMismatch {
            copy_id: 4,
            game_id: 1,
            status: CopyStatus::Rented,
            rental_id: 9,
            rental_kind: RentalKind::Dibs,
        };
        assert_eq!(plan_action(&dup), RepairAction::ManualReview);
        assert_eq!(plan_action(&mismatch), RepairAction::ManualReview);
        assert!(manual_review_reason(&mismatch).contains("RENTED with open DIBS"));
    }
}
