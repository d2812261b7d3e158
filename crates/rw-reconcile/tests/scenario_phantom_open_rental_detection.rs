use chrono::{TimeZone, Utc};
use rw_reconcile::*;
use rw_schemas::{CopyStatus, GameCopy, Rental, RentalKind, Renter};

fn open_rental(id: i64, copy_id: i64) -> Rental {
    Rental {
        rental_id: id,
        copy_id,
        game_id: 4,
        game_name: None,
        renter: Renter::guest("ghost"),
        kind: RentalKind::Rent,
        borrowed_at: Utc.with_ymd_and_hms(2026, 2, 3, 15, 0, 0).unwrap(),
        due_at: None,
        returned_at: None,
    }
}

#[test]
fn scenario_available_copy_with_open_rental_is_phantom() {
    let copies = vec![GameCopy::new(4, 4, CopyStatus::Available)];
    let rentals = vec![open_rental(44, 4), open_rental(41, 4)];

    let v = find_violations(&copies, &rentals);
    assert_eq!(
        v,
        vec![Violation::PhantomOpenRental {
            copy_id: 4,
            game_id: 4,
            rental_ids: vec![41, 44],
        }]
    );
}

#[test]
fn scenario_available_copies_report_iff_referenced() {
    let copies: Vec<GameCopy> = (1..=6)
        .map(|id| GameCopy::new(id, 4, CopyStatus::Available))
        .collect();
    // Only even copies are referenced by open rentals.
    let rentals: Vec<Rental> = (1..=6)
        .filter(|id| id % 2 == 0)
        .map(|id| open_rental(100 + id, id))
        .collect();

    let v = find_violations(&copies, &rentals);
    let flagged: Vec<i64> = v.iter().map(|x| x.copy_id()).collect();
    assert_eq!(flagged, vec![2, 4, 6]);
    assert!(v.iter().all(|x| x.kind() == ViolationKind::PhantomOpenRental));
}

#[test]
fn scenario_violations_serialize_with_kind_tag() {
    let copies = vec![GameCopy::new(4, 4, CopyStatus::Available)];
    let v = find_violations(&copies, &[open_rental(1, 4)]);
    let json = serde_json::to_value(&v[0]).unwrap();
    assert_eq!(json["kind"], "PHANTOM_OPEN_RENTAL");
    assert_eq!(json["copy_id"], 4);
    assert_eq!(json["rental_ids"][0], 1);
}
