//! Direct Postgres backend for the rental store.
//!
//! Read-only except through the store's own transition procedures, which
//! [`PgTransitions`] invokes by name.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod error;
mod reader;
mod rpc;
mod schema;

pub use error::{classify_read_error, classify_rpc_error};
pub use reader::PgStateReader;
pub use rpc::{valid_function_name, PgTransitions};
pub use schema::{missing_columns, probe_schema, EXPECTED_COLUMNS};

/// Env var the DB-backed tests read their connection string from.
pub const ENV_DB_URL: &str = "RW_DATABASE_URL";

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStatus {
    pub ok: bool,
    pub has_game_copies: bool,
    pub has_rentals: bool,
    /// `table.column` entries the reader needs but the database lacks.
    pub missing_columns: Vec<String>,
}

impl DbStatus {
    pub fn is_ready(&self) -> bool {
        self.ok && self.missing_columns.is_empty()
    }
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let missing = probe_schema(pool)
        .await
        .context("status schema probe failed")?;

    let table_absent = |t: &str| {
        let cols = EXPECTED_COLUMNS
            .iter()
            .find(|(name, _)| *name == t)
            .map(|(_, c)| c.len())
            .unwrap_or(0);
        let prefix = format!("{t}.");
        missing.iter().filter(|m| m.starts_with(&prefix)).count() == cols
    };

    Ok(DbStatus {
        ok: one == 1,
        has_game_copies: !table_absent("game_copies"),
        has_rentals: !table_absent("rentals"),
        missing_columns: missing,
    })
}
