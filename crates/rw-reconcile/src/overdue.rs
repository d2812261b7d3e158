//! Overdue loans and expired DIBS holds.
//!
//! Informational only: nothing here is repaired automatically. Both lists
//! are ordered by due time (oldest first), then rental id.

use chrono::{DateTime, Utc};
use rw_schemas::{CopyId, GameId, Rental, RentalId, RentalKind};
use serde::{Deserialize, Serialize};

/// An open RENT whose due time has passed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueRental {
    pub rental_id: RentalId,
    pub copy_id: CopyId,
    pub game_id: GameId,
    pub game_name: Option<String>,
    pub renter: String,
    pub due_at: DateTime<Utc>,
    /// Whole days past due (0 on the first day).
    pub days_overdue: i64,
}

/// An open DIBS whose hold window has passed without pickup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredDibs {
    pub rental_id: RentalId,
    pub copy_id: CopyId,
    pub game_id: GameId,
    pub game_name: Option<String>,
    pub renter: String,
    pub due_at: DateTime<Utc>,
    pub minutes_expired: i64,
}

fn past_due<'a>(
    open_rentals: &'a [Rental],
    kind: RentalKind,
    now: DateTime<Utc>,
) -> Vec<(&'a Rental, DateTime<Utc>)> {
    let mut out: Vec<(&Rental, DateTime<Utc>)> = open_rentals
        .iter()
        .filter(|r| r.is_open() && r.kind == kind)
        .filter_map(|r| r.due_at.filter(|due| *due < now).map(|due| (r, due)))
        .collect();
    out.sort_by_key(|(r, due)| (*due, r.rental_id));
    out
}

/// Open RENT rentals past due at `now`. Rentals without a due time never
/// count as overdue.
pub fn find_overdue(open_rentals: &[Rental], now: DateTime<Utc>) -> Vec<OverdueRental> {
    past_due(open_rentals, RentalKind::Rent, now)
        .into_iter()
        .map(|(r, due)| OverdueRental {
            rental_id: r.rental_id,
            copy_id: r.copy_id,
            game_id: r.game_id,
            game_name: r.game_name.clone(),
            renter: r.renter.label(),
            due_at: due,
            days_overdue: now.signed_duration_since(due).num_days(),
        })
        .collect()
}

/// Open DIBS holds whose due time has passed at `now`.
pub fn find_expired_dibs(open_rentals: &[Rental], now: DateTime<Utc>) -> Vec<ExpiredDibs> {
    past_due(open_rentals, RentalKind::Dibs, now)
        .into_iter()
        .map(|(r, due)| ExpiredDibs {
            rental_id: r.rental_id,
            copy_id: r.copy_id,
            game_id: r.game_id,
            game_name: r.game_name.clone(),
            renter: r.renter.label(),
            due_at: due,
            minutes_expired: now.signed_duration_since(due).num_minutes(),
        })
        .collect()
}
