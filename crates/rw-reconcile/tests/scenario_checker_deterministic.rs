use chrono::{Duration, TimeZone, Utc};
use rw_reconcile::*;
use rw_schemas::{CopyStatus, GameCopy, Rental, RentalKind, Renter};

fn open_rental(id: i64, copy_id: i64, kind: RentalKind, offset_min: i64) -> Rental {
    Rental {
        rental_id: id,
        copy_id,
        game_id: copy_id * 10,
        game_name: None,
        renter: Renter::guest("det"),
        kind,
        borrowed_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
            + Duration::minutes(offset_min),
        due_at: None,
        returned_at: None,
    }
}

fn mixed_state() -> (Vec<GameCopy>, Vec<Rental>) {
    let copies = vec![
        GameCopy::new(9, 90, CopyStatus::Available),
        GameCopy::new(1, 10, CopyStatus::Reserved),
        GameCopy::new(5, 50, CopyStatus::Rented),
        GameCopy::new(3, 30, CopyStatus::Reserved),
        GameCopy::new(2, 20, CopyStatus::Rented),
    ];
    let rentals = vec![
        open_rental(91, 9, RentalKind::Rent, 1),
        open_rental(51, 5, RentalKind::Dibs, 2),
        open_rental(31, 3, RentalKind::Dibs, 3),
        open_rental(32, 3, RentalKind::Dibs, 4),
        open_rental(21, 2, RentalKind::Rent, 5),
    ];
    (copies, rentals)
}

#[test]
fn scenario_output_is_ordered_by_copy() {
    let (copies, rentals) = mixed_state();
    let v = find_violations(&copies, &rentals);
    let ids: Vec<i64> = v.iter().map(|x| x.copy_id()).collect();
    assert_eq!(ids, vec![1, 3, 5, 9]);
    assert_eq!(
        v.iter().map(|x| x.kind()).collect::<Vec<_>>(),
        vec![
            ViolationKind::OrphanedReservation,
            ViolationKind::DuplicateOpenRental,
            ViolationKind::StatusMismatch,
            ViolationKind::PhantomOpenRental,
        ]
    );
}

#[test]
fn scenario_checker_is_idempotent_and_order_insensitive() {
    let (copies, rentals) = mixed_state();
    let a = find_violations(&copies, &rentals);
    let b = find_violations(&copies, &rentals);
    assert_eq!(a, b);

    let mut copies_rev = copies.clone();
    copies_rev.reverse();
    let mut rentals_rev = rentals.clone();
    rentals_rev.reverse();
    assert_eq!(a, find_violations(&copies_rev, &rentals_rev));
}

#[test]
fn scenario_empty_state_is_consistent() {
    assert!(is_consistent(&[], &[]));
    assert!(dangling_rentals(&[], &[]).is_empty());
}
