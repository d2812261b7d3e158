//! Shared record shapes for the rental inventory.
//!
//! These mirror the two store tables this workspace reads (`game_copies` and
//! `rentals`). No IO here; adapters decode into these types and the checker
//! consumes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type CopyId = i64;
pub type GameId = i64;
pub type RentalId = i64;

// ---------------------------------------------------------------------------
// Literal parse error
// ---------------------------------------------------------------------------

/// A stored enum literal that this workspace does not know.
///
/// Adapters surface this as a schema mismatch: the store and the code
/// disagree about the allowed values of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLiteral {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} literal: {:?}", self.field, self.value)
    }
}

impl std::error::Error for UnknownLiteral {}

// ---------------------------------------------------------------------------
// Game copy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    Available,
    Reserved,
    Rented,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "AVAILABLE",
            CopyStatus::Reserved => "RESERVED",
            CopyStatus::Rented => "RENTED",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownLiteral> {
        match s.trim() {
            "AVAILABLE" => Ok(CopyStatus::Available),
            "RESERVED" => Ok(CopyStatus::Reserved),
            "RENTED" => Ok(CopyStatus::Rented),
            other => Err(UnknownLiteral {
                field: "game_copies.status",
                value: other.to_string(),
            }),
        }
    }

    /// The rental kind an open rental must have for this status, if any.
    pub fn expected_kind(&self) -> Option<RentalKind> {
        match self {
            CopyStatus::Available => None,
            CopyStatus::Reserved => Some(RentalKind::Dibs),
            CopyStatus::Rented => Some(RentalKind::Rent),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CopyStatus::Available)
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical unit of a rentable game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCopy {
    pub copy_id: CopyId,
    pub game_id: GameId,
    /// Joined from `games.name` when the reader has it; reporting only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    pub status: CopyStatus,
}

impl GameCopy {
    pub fn new(copy_id: CopyId, game_id: GameId, status: CopyStatus) -> Self {
        Self {
            copy_id,
            game_id,
            game_name: None,
            status,
        }
    }

    pub fn with_game_name(mut self, name: impl Into<String>) -> Self {
        self.game_name = Some(name.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Rental
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RentalKind {
    /// Reservation hold before physical pickup.
    Dibs,
    /// Active loan.
    Rent,
}

impl RentalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalKind::Dibs => "DIBS",
            RentalKind::Rent => "RENT",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownLiteral> {
        match s.trim() {
            "DIBS" => Ok(RentalKind::Dibs),
            "RENT" => Ok(RentalKind::Rent),
            other => Err(UnknownLiteral {
                field: "rentals.type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for RentalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who holds a rental. Members carry a user id; walk-in renters only a name.
/// Both may be present when the admin typed a name for a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Renter {
    pub fn member(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            name: None,
        }
    }

    pub fn guest(name: impl Into<String>) -> Self {
        Self {
            user_id: None,
            name: Some(name.into()),
        }
    }

    /// Best label for reports: the typed name, else the user id, else "unknown".
    pub fn label(&self) -> String {
        match (&self.name, &self.user_id) {
            (Some(n), _) if !n.trim().is_empty() => n.trim().to_string(),
            (_, Some(u)) => u.to_string(),
            _ => "unknown".to_string(),
        }
    }
}

/// One borrowing or reservation episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    pub rental_id: RentalId,
    pub copy_id: CopyId,
    pub game_id: GameId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,
    pub renter: Renter,
    pub kind: RentalKind,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Rental {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}

// ---------------------------------------------------------------------------
// Read scope / state
// ---------------------------------------------------------------------------

/// How much of the store a pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Every copy plus every open rental (full audit).
    All,
    /// Only copies that are not AVAILABLE, with their open rentals.
    ReservedOnly,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::ReservedOnly => "reserved-only",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownLiteral> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Scope::All),
            "reserved-only" | "reserved_only" => Ok(Scope::ReservedOnly),
            other => Err(UnknownLiteral {
                field: "scope",
                value: other.to_string(),
            }),
        }
    }
}

/// Materialized state as returned by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    pub copies: Vec<GameCopy>,
    /// Rentals with `returned_at IS NULL`.
    pub open_rentals: Vec<Rental>,
    pub read_at: DateTime<Utc>,
}

impl StoreState {
    pub fn new(copies: Vec<GameCopy>, open_rentals: Vec<Rental>) -> Self {
        Self {
            copies,
            open_rentals,
            read_at: Utc::now(),
        }
    }
}
