use chrono::Utc;
use rw_repair::{CopySnapshot, StateReader, StoreError};
use rw_schemas::{CopyId, CopyStatus, GameCopy, Rental, RentalKind, Renter, Scope, StoreState};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::error::classify_read_error;
use crate::schema::probe_schema;

const COPY_COLUMNS: &str = "c.copy_id, c.game_id, c.status::text as status";

const RENTAL_COLUMNS: &str = r#"
    r.rental_id, r.copy_id, r.game_id, r.game_name, r.user_id, r.renter_name,
    r.type::text as kind, r.borrowed_at, r.due_date, r.returned_at
"#;

/// [`StateReader`] over a direct Postgres connection.
///
/// Copies and open rentals are read inside one read-only REPEATABLE READ
/// transaction so both lists come from the same snapshot.
#[derive(Clone)]
pub struct PgStateReader {
    pool: PgPool,
}

impl PgStateReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn snapshot_tx(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("set transaction isolation level repeatable read, read only")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn read_state(&self, scope: Scope) -> Result<StoreState, StoreError> {
        let mut tx = self.snapshot_tx().await.map_err(|e| classify_read_error(&e))?;

        let copy_filter = match scope {
            Scope::All => "",
            Scope::ReservedOnly => "where c.status::text <> 'AVAILABLE'",
        };
        let copy_rows = sqlx::query(&format!(
            "select {COPY_COLUMNS} from game_copies c {copy_filter} order by c.copy_id"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| classify_read_error(&e))?;

        let rental_filter = match scope {
            Scope::All => "",
            Scope::ReservedOnly => {
                "and exists (select 1 from game_copies c \
                 where c.copy_id = r.copy_id and c.status::text <> 'AVAILABLE')"
            }
        };
        let rental_rows = sqlx::query(&format!(
            "select {RENTAL_COLUMNS} from rentals r \
             where r.returned_at is null {rental_filter} order by r.rental_id"
        ))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| classify_read_error(&e))?;

        tx.commit().await.map_err(|e| classify_read_error(&e))?;

        let copies = copy_rows
            .iter()
            .map(copy_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let open_rentals = rental_rows
            .iter()
            .map(rental_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            scope = scope.as_str(),
            copies = copies.len(),
            open_rentals = open_rentals.len(),
            "postgres state read"
        );

        Ok(StoreState {
            copies,
            open_rentals,
            read_at: Utc::now(),
        })
    }
}

fn copy_from_row(row: &PgRow) -> Result<GameCopy, StoreError> {
    let get = |e: sqlx::Error| classify_read_error(&e);
    let status: String = row.try_get("status").map_err(get)?;
    Ok(GameCopy::new(
        row.try_get("copy_id").map_err(get)?,
        row.try_get("game_id").map_err(get)?,
        CopyStatus::parse(&status)?,
    ))
}

fn rental_from_row(row: &PgRow) -> Result<Rental, StoreError> {
    let get = |e: sqlx::Error| classify_read_error(&e);
    let kind: String = row.try_get("kind").map_err(get)?;
    Ok(Rental {
        rental_id: row.try_get("rental_id").map_err(get)?,
        copy_id: row.try_get("copy_id").map_err(get)?,
        game_id: row.try_get("game_id").map_err(get)?,
        game_name: row.try_get("game_name").map_err(get)?,
        renter: Renter {
            user_id: row.try_get("user_id").map_err(get)?,
            name: row.try_get("renter_name").map_err(get)?,
        },
        kind: RentalKind::parse(&kind)?,
        borrowed_at: row.try_get("borrowed_at").map_err(get)?,
        due_at: row.try_get("due_date").map_err(get)?,
        returned_at: row.try_get("returned_at").map_err(get)?,
    })
}

#[async_trait::async_trait]
impl StateReader for PgStateReader {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn verify_schema(&self) -> Result<(), StoreError> {
        let missing = probe_schema(&self.pool)
            .await
            .map_err(|e| classify_read_error(&e))?;
        match missing.first() {
            None => Ok(()),
            Some(col) => Err(StoreError::SchemaMismatch(format!("missing column {col}"))),
        }
    }

    async fn load_state(&self, scope: Scope) -> Result<StoreState, StoreError> {
        self.read_state(scope).await
    }

    async fn load_copy(&self, copy_id: CopyId) -> Result<CopySnapshot, StoreError> {
        let mut tx = self.snapshot_tx().await.map_err(|e| classify_read_error(&e))?;

        let copy_row = sqlx::query(&format!(
            "select {COPY_COLUMNS} from game_copies c where c.copy_id = $1"
        ))
        .bind(copy_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify_read_error(&e))?;

        let rental_rows = sqlx::query(&format!(
            "select {RENTAL_COLUMNS} from rentals r \
             where r.copy_id = $1 and r.returned_at is null order by r.rental_id"
        ))
        .bind(copy_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| classify_read_error(&e))?;

        tx.commit().await.map_err(|e| classify_read_error(&e))?;

        Ok(CopySnapshot {
            copy: copy_row.as_ref().map(copy_from_row).transpose()?,
            open_rentals: rental_rows
                .iter()
                .map(rental_from_row)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}
