//! Collaborator boundary: the store reader and the transition procedures.
//!
//! Implementations live in adapter crates (direct Postgres, PostgREST) and in
//! the testkit. Both traits are object-safe and `Send + Sync` so callers can
//! hold `&dyn` handles across await points.

use std::fmt;

use rw_schemas::{CopyId, GameCopy, GameId, Rental, RentalId, Scope, StoreState};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Read-side failures. Either one aborts a pass before any repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity failure (network, TLS, pool exhaustion, 5xx). Transient.
    Unavailable(String),
    /// Expected table/column/literal absent. Fatal until config or schema is fixed.
    SchemaMismatch(String),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::SchemaMismatch(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rw_schemas::UnknownLiteral> for StoreError {
    fn from(e: rw_schemas::UnknownLiteral) -> Self {
        StoreError::SchemaMismatch(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A single copy re-read for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySnapshot {
    /// `None` when the copy no longer exists.
    pub copy: Option<GameCopy>,
    pub open_rentals: Vec<Rental>,
}

#[async_trait::async_trait]
pub trait StateReader: Send + Sync {
    /// Short backend label for logs and reports (e.g. `"postgres"`).
    fn backend_name(&self) -> &'static str;

    /// Confirm every expected column is present.
    async fn verify_schema(&self) -> Result<(), StoreError>;

    async fn load_state(&self, scope: Scope) -> Result<StoreState, StoreError>;

    async fn load_copy(&self, copy_id: CopyId) -> Result<CopySnapshot, StoreError>;
}

// ---------------------------------------------------------------------------
// Transition procedures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The procedure ran and answered `success: false`.
    Rejected(String),
    /// Network, connection or database error while calling.
    Transport(String),
    /// The answer could not be interpreted.
    Decode(String),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Rejected(msg) => write!(f, "procedure rejected: {msg}"),
            RpcError::Transport(msg) => write!(f, "rpc transport error: {msg}"),
            RpcError::Decode(msg) => write!(f, "rpc decode error: {msg}"),
        }
    }
}

impl std::error::Error for RpcError {}

/// The atomic rent/return procedures owned by the store.
#[async_trait::async_trait]
pub trait TransitionRpc: Send + Sync {
    /// Move an AVAILABLE (or reserved-by-this-renter) copy of `game_id` to
    /// RENTED. Returns the new rental id when the procedure reports one.
    async fn rent_copy(
        &self,
        game_id: GameId,
        renter_name: &str,
        user_id: Option<Uuid>,
    ) -> Result<Option<RentalId>, RpcError>;

    /// Force return: set a copy of `game_id` back to AVAILABLE and close its
    /// lingering open rental.
    async fn return_copy(&self, game_id: GameId) -> Result<(), RpcError>;
}

/// Interpret the JSON answer of a transition procedure.
///
/// Procedures answer `{ "success": bool, "message": "...", "rental_id": n }`.
/// A bare `null` (void function) counts as success; `success: false` is a
/// rejection carrying the message.
pub fn interpret_procedure_reply(reply: &Value) -> Result<Option<RentalId>, RpcError> {
    match reply {
        Value::Null => Ok(None),
        Value::Bool(true) => Ok(None),
        Value::Bool(false) => Err(RpcError::Rejected("procedure returned false".to_string())),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| RpcError::Decode(format!("non-integer reply: {n}"))),
        Value::Object(map) => {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                let msg = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("procedure reported failure")
                    .to_string();
                return Err(RpcError::Rejected(msg));
            }
            Ok(map.get("rental_id").and_then(Value::as_i64))
        }
        other => Err(RpcError::Decode(format!("unexpected reply shape: {other}"))),
    }
}
