use chrono::{DateTime, Utc};
use rw_schemas::{CopyStatus, GameCopy, Rental, RentalKind, Renter, UnknownLiteral};
use serde::Deserialize;
use uuid::Uuid;

pub(crate) const COPY_SELECT: &str = "copy_id,game_id,status";
pub(crate) const RENTAL_SELECT: &str =
    "rental_id,copy_id,game_id,game_name,user_id,renter_name,type,borrowed_at,due_date,returned_at";

#[derive(Debug, Deserialize)]
pub(crate) struct CopyRow {
    copy_id: i64,
    game_id: i64,
    status: String,
}

impl CopyRow {
    pub(crate) fn into_copy(self) -> Result<GameCopy, UnknownLiteral> {
        Ok(GameCopy::new(
            self.copy_id,
            self.game_id,
            CopyStatus::parse(&self.status)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RentalRow {
    rental_id: i64,
    copy_id: i64,
    game_id: i64,
    game_name: Option<String>,
    user_id: Option<Uuid>,
    renter_name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    borrowed_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
}

impl RentalRow {
    pub(crate) fn into_rental(self) -> Result<Rental, UnknownLiteral> {
        Ok(Rental {
            rental_id: self.rental_id,
            copy_id: self.copy_id,
            game_id: self.game_id,
            game_name: self.game_name,
            renter: Renter {
                user_id: self.user_id,
                name: self.renter_name,
            },
            kind: RentalKind::parse(&self.kind)?,
            borrowed_at: self.borrowed_at,
            due_at: self.due_date,
            returned_at: self.returned_at,
        })
    }
}
