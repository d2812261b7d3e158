use anyhow::{bail, Result};
use rw_repair::{interpret_procedure_reply, RpcError, TransitionRpc};
use rw_schemas::{GameId, RentalId};
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::classify_rpc_error;

/// Procedure names are interpolated into SQL, so they must be plain
/// (optionally schema-qualified) lowercase identifiers.
pub fn valid_function_name(name: &str) -> bool {
    let part_ok = |p: &str| {
        let mut chars = p.chars();
        matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_lowercase())
            && chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
    };
    let parts: Vec<&str> = name.split('.').collect();
    (1..=2).contains(&parts.len()) && parts.iter().all(|p| part_ok(p))
}

/// Calls the store's rent/return procedures over the same pool.
#[derive(Clone)]
pub struct PgTransitions {
    pool: PgPool,
    rent_fn: String,
    return_fn: String,
}

impl PgTransitions {
    pub fn new(pool: PgPool, rent_fn: &str, return_fn: &str) -> Result<Self> {
        for f in [rent_fn, return_fn] {
            if !valid_function_name(f) {
                bail!("invalid procedure name: {f:?}");
            }
        }
        Ok(Self {
            pool,
            rent_fn: rent_fn.to_string(),
            return_fn: return_fn.to_string(),
        })
    }

    async fn call(&self, sql: &str, binds: Binds<'_>) -> Result<Value, RpcError> {
        let mut q = sqlx::query_scalar::<_, Option<Value>>(sql).bind(binds.game_id);
        if let Some((name, user_id)) = binds.renter {
            q = q.bind(name).bind(user_id);
        }
        let reply = q
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_rpc_error(&e))?;
        Ok(reply.unwrap_or(Value::Null))
    }
}

struct Binds<'a> {
    game_id: GameId,
    renter: Option<(&'a str, Option<Uuid>)>,
}

#[async_trait::async_trait]
impl TransitionRpc for PgTransitions {
    async fn rent_copy(
        &self,
        game_id: GameId,
        renter_name: &str,
        user_id: Option<Uuid>,
    ) -> Result<Option<RentalId>, RpcError> {
        let sql = format!(
            "select to_jsonb({}(p_game_id => $1, p_renter_name => $2, p_user_id => $3))",
            self.rent_fn
        );
        debug!(game_id, function = %self.rent_fn, "calling rent procedure");
        let reply = self
            .call(
                &sql,
                Binds {
                    game_id,
                    renter: Some((renter_name, user_id)),
                },
            )
            .await?;
        interpret_procedure_reply(&reply)
    }

    async fn return_copy(&self, game_id: GameId) -> Result<(), RpcError> {
        let sql = format!("select to_jsonb({}(p_game_id => $1))", self.return_fn);
        debug!(game_id, function = %self.return_fn, "calling return procedure");
        let reply = self
            .call(
                &sql,
                Binds {
                    game_id,
                    renter: None,
                },
            )
            .await?;
        interpret_procedure_reply(&reply).map(|_| ())
    }
}
