use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rw_schemas::{CopyStatus, GameCopy, Rental, RentalKind, Renter};
use serde::Deserialize;

use crate::InMemoryStore;

#[derive(Debug, Deserialize)]
struct StoreFixture {
    #[serde(default)]
    copies: Vec<GameCopy>,
    #[serde(default)]
    rentals: Vec<Rental>,
}

/// Load `{ "copies": [...], "rentals": [...] }` into an in-memory store.
pub fn load_store_json(path: &str) -> Result<InMemoryStore> {
    let s = fs::read_to_string(path).with_context(|| format!("read fixture: {path}"))?;
    let fx: StoreFixture = serde_json::from_str(&s).context("parse store fixture json")?;

    let mut store = InMemoryStore::new();
    for c in fx.copies {
        store = store.with_copy(c);
    }
    for r in fx.rentals {
        store = store.with_rental(r);
    }
    Ok(store)
}

/// Load a `game_copies` CSV export (`copy_id,game_id,status`, header row).
pub fn load_copies_csv(path: &str) -> Result<Vec<GameCopy>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("open copies csv: {path}"))?;
    let mut out = Vec::new();

    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let field = |i: usize| rec.get(i).map(str::trim).unwrap_or("");
        let copy_id: i64 = field(0)
            .parse()
            .with_context(|| format!("row {}: parse copy_id", line + 1))?;
        let game_id: i64 = field(1)
            .parse()
            .with_context(|| format!("row {}: parse game_id", line + 1))?;
        let status = CopyStatus::parse(field(2))?;
        out.push(GameCopy::new(copy_id, game_id, status));
    }

    for w in out.windows(2) {
        if w[0].copy_id >= w[1].copy_id {
            anyhow::bail!("copies csv not sorted by copy_id");
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

pub fn open_dibs(rental_id: i64, copy: &GameCopy, borrowed_at: DateTime<Utc>) -> Rental {
    open_rental(rental_id, copy, RentalKind::Dibs, borrowed_at)
}

pub fn open_rent(rental_id: i64, copy: &GameCopy, borrowed_at: DateTime<Utc>) -> Rental {
    open_rental(rental_id, copy, RentalKind::Rent, borrowed_at)
}

pub fn open_rental(
    rental_id: i64,
    copy: &GameCopy,
    kind: RentalKind,
    borrowed_at: DateTime<Utc>,
) -> Rental {
    Rental {
        rental_id,
        copy_id: copy.copy_id,
        game_id: copy.game_id,
        game_name: copy.game_name.clone(),
        renter: Renter::guest(format!("renter-{rental_id}")),
        kind,
        borrowed_at,
        due_at: None,
        returned_at: None,
    }
}
