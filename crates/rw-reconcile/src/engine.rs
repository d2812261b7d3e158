use std::collections::{BTreeMap, BTreeSet};

use rw_schemas::{CopyId, GameCopy, Rental, RentalId};

use crate::Violation;

/// Group open rentals by the copy they reference. Closed rows are dropped so
/// callers may pass a mixed list.
fn open_rentals_by_copy(open_rentals: &[Rental]) -> BTreeMap<CopyId, Vec<&Rental>> {
    let mut by_copy: BTreeMap<CopyId, Vec<&Rental>> = BTreeMap::new();
    for r in open_rentals.iter().filter(|r| r.is_open()) {
        by_copy.entry(r.copy_id).or_default().push(r);
    }
    by_copy
}

/// Classify one copy against the open rentals that reference it.
///
/// `rentals` may contain rentals of other copies or closed rentals; both are
/// ignored.
pub fn check_copy(copy: &GameCopy, rentals: &[Rental]) -> Option<Violation> {
    let open: Vec<&Rental> = rentals
        .iter()
        .filter(|r| r.is_open() && r.copy_id == copy.copy_id)
        .collect();
    classify(copy, &open)
}

fn classify(copy: &GameCopy, open: &[&Rental]) -> Option<Violation> {
    let Some(expected) = copy.status.expected_kind() else {
        // AVAILABLE: any open rental is a phantom.
        if open.is_empty() {
            return None;
        }
        let mut rental_ids: Vec<RentalId> = open.iter().map(|r| r.rental_id).collect();
        rental_ids.sort_unstable();
        return Some(Violation::PhantomOpenRental {
            copy_id: copy.copy_id,
            game_id: copy.game_id,
            rental_ids,
        });
    };

    match open {
        [] => Some(Violation::OrphanedReservation {
            copy_id: copy.copy_id,
            game_id: copy.game_id,
            status: copy.status,
        }),

        [only] => {
            if only.kind == expected {
                None
            } else {
                Some(Violation::StatusMismatch {
                    copy_id: copy.copy_id,
                    game_id: copy.game_id,
                    status: copy.status,
                    rental_id: only.rental_id,
                    rental_kind: only.kind,
                })
            }
        }

        many => {
            // Most recent borrowed_at wins; ties go to the higher rental id.
            let kept = many
                .iter()
                .max_by(|a, b| {
                    a.borrowed_at
                        .cmp(&b.borrowed_at)
                        .then(a.rental_id.cmp(&b.rental_id))
                })
                .map(|r| r.rental_id)?;

            let mut redundant: Vec<RentalId> = many
                .iter()
                .map(|r| r.rental_id)
                .filter(|id| *id != kept)
                .collect();
            redundant.sort_unstable();

            Some(Violation::DuplicateOpenRental {
                copy_id: copy.copy_id,
                game_id: copy.game_id,
                status: copy.status,
                kept,
                redundant,
            })
        }
    }
}

/// Deterministic consistency check over a full read.
///
/// Every copy is classified at most once (first occurrence wins if the input
/// repeats a copy id). Output is ordered by copy id, then violation kind, so
/// the same input always yields the same list.
pub fn find_violations(copies: &[GameCopy], open_rentals: &[Rental]) -> Vec<Violation> {
    let by_copy = open_rentals_by_copy(open_rentals);
    let mut seen: BTreeSet<CopyId> = BTreeSet::new();
    let mut out: Vec<Violation> = Vec::new();

    for copy in copies {
        if !seen.insert(copy.copy_id) {
            continue;
        }
        let open = by_copy
            .get(&copy.copy_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        if let Some(v) = classify(copy, open) {
            out.push(v);
        }
    }

    out.sort_by_key(|v| (v.copy_id(), v.kind()));
    out
}

/// Open rentals whose copy is not part of `copies`. They cannot be
/// classified; callers log them.
pub fn dangling_rentals(copies: &[GameCopy], open_rentals: &[Rental]) -> Vec<RentalId> {
    let known: BTreeSet<CopyId> = copies.iter().map(|c| c.copy_id).collect();
    let mut out: Vec<RentalId> = open_rentals
        .iter()
        .filter(|r| r.is_open() && !known.contains(&r.copy_id))
        .map(|r| r.rental_id)
        .collect();
    out.sort_unstable();
    out
}

/// `true` when the read contains no violation.
pub fn is_consistent(copies: &[GameCopy], open_rentals: &[Rental]) -> bool {
    find_violations(copies, open_rentals).is_empty()
}
