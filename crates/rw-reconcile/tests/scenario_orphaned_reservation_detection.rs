use chrono::{TimeZone, Utc};
use rw_reconcile::*;
use rw_schemas::{CopyStatus, GameCopy, Rental, RentalKind, Renter};

fn open_rental(id: i64, copy_id: i64, kind: RentalKind) -> Rental {
    Rental {
        rental_id: id,
        copy_id,
        game_id: 7,
        game_name: Some("감자의 꿈".to_string()),
        renter: Renter::guest("walk-in"),
        kind,
        borrowed_at: Utc.with_ymd_and_hms(2026, 2, 15, 18, 0, 0).unwrap(),
        due_at: None,
        returned_at: None,
    }
}

#[test]
fn scenario_reserved_copy_without_open_rental_is_orphaned() {
    let copies = vec![GameCopy::new(1, 7, CopyStatus::Reserved)];

    let v = find_violations(&copies, &[]);
    assert_eq!(
        v,
        vec![Violation::OrphanedReservation {
            copy_id: 1,
            game_id: 7,
            status: CopyStatus::Reserved,
        }]
    );
}

#[test]
fn scenario_every_non_available_copy_without_rentals_reports_exactly_one_orphan() {
    let copies = vec![
        GameCopy::new(1, 7, CopyStatus::Reserved),
        GameCopy::new(2, 7, CopyStatus::Rented),
        GameCopy::new(3, 8, CopyStatus::Rented),
        GameCopy::new(4, 8, CopyStatus::Available),
    ];
    // Copy 3 has a legitimate loan; 1 and 2 have nothing.
    let rentals = vec![open_rental(30, 3, RentalKind::Rent)];

    let v = find_violations(&copies, &rentals);
    let orphans: Vec<i64> = v
        .iter()
        .filter(|x| x.kind() == ViolationKind::OrphanedReservation)
        .map(|x| x.copy_id())
        .collect();
    assert_eq!(orphans, vec![1, 2]);
    assert_eq!(v.len(), 2, "no other violation expected: {v:?}");
}

#[test]
fn scenario_closed_rental_does_not_cover_a_reservation() {
    let copies = vec![GameCopy::new(1, 7, CopyStatus::Reserved)];
    let mut dibs = open_rental(10, 1, RentalKind::Dibs);
    dibs.returned_at = Some(Utc.with_ymd_and_hms(2026, 2, 15, 18, 30, 0).unwrap());

    let v = find_violations(&copies, &[dibs]);
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].kind(), ViolationKind::OrphanedReservation);
}
