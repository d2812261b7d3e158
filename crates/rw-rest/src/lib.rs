//! PostgREST (Supabase `/rest/v1`) backend for the rental store.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use rw_repair::{
    interpret_procedure_reply, CopySnapshot, RpcError, StateReader, StoreError, TransitionRpc,
};
use rw_schemas::{CopyId, GameCopy, GameId, Rental, RentalId, Scope, StoreState};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

mod error;
mod rows;

use rows::{CopyRow, RentalRow, COPY_SELECT, RENTAL_SELECT};

/// Rows per request; PostgREST deployments commonly cap responses at 1000.
pub const PAGE_SIZE: usize = 1000;

/// Bound on every request, connect through body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Reader and procedure client over PostgREST.
///
/// The API key is sent both as `apikey` and as a bearer token. It is never
/// logged and is redacted from `Debug`.
#[derive(Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    rent_fn: String,
    return_fn: String,
    page_size: usize,
}

impl fmt::Debug for PostgrestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("rent_fn", &self.rent_fn)
            .field("return_fn", &self.return_fn)
            .finish()
    }
}

impl PostgrestStore {
    /// `base_url` is the project URL; `/rest/v1` is appended.
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self::new_with_base_url(format!("{}/rest/v1", base_url.trim_end_matches('/')), api_key)
    }

    /// `base_url` points directly at the PostgREST root.
    pub fn new_with_base_url(base_url: String, api_key: String) -> Self {
        Self {
            http: http_client(REQUEST_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            rent_fn: "admin_rent_copy".to_string(),
            return_fn: "admin_return_copy".to_string(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_procedures(mut self, rent_fn: &str, return_fn: &str) -> Self {
        self.rent_fn = rent_fn.to_string();
        self.return_fn = return_fn.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{path}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let resp = self
            .request(reqwest::Method::GET, table)
            .query(params)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{table} request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{table} body read failed: {e}")))?;

        if !status.is_success() {
            return Err(error::read_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| StoreError::SchemaMismatch(format!("{table} row decode failed: {e}")))
    }

    /// Read every matching row, `page_size` at a time, in `order`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: &str,
    ) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        loop {
            let mut params: Vec<(&str, String)> = filters.to_vec();
            params.push(("order", order.to_string()));
            params.push(("limit", self.page_size.to_string()));
            params.push(("offset", offset.to_string()));

            let page: Vec<T> = self.get_rows(table, &params).await?;
            let n = page.len();
            out.extend(page);
            if n < self.page_size {
                break;
            }
            offset += n;
        }
        Ok(out)
    }

    async fn copies(&self, filters: &[(&str, String)]) -> Result<Vec<GameCopy>, StoreError> {
        let mut f = vec![("select", COPY_SELECT.to_string())];
        f.extend_from_slice(filters);
        let rows: Vec<CopyRow> = self.get_all("game_copies", &f, "copy_id.asc").await?;
        Ok(rows
            .into_iter()
            .map(CopyRow::into_copy)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn open_rentals(&self, filters: &[(&str, String)]) -> Result<Vec<Rental>, StoreError> {
        let mut f = vec![
            ("select", RENTAL_SELECT.to_string()),
            ("returned_at", "is.null".to_string()),
        ];
        f.extend_from_slice(filters);
        let rows: Vec<RentalRow> = self.get_all("rentals", &f, "rental_id.asc").await?;
        Ok(rows
            .into_iter()
            .map(RentalRow::into_rental)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn call_procedure(&self, function: &str, args: Value) -> Result<Value, RpcError> {
        debug!(function, "calling procedure over rest");
        let resp = self
            .request(reqwest::Method::POST, &format!("rpc/{function}"))
            .json(&args)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(error::rpc_error(status, &body));
        }
        if body.trim().is_empty() {
            // 204 from a void function.
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| RpcError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl StateReader for PostgrestStore {
    fn backend_name(&self) -> &'static str {
        "rest"
    }

    /// One-row projections of every expected column; PostgREST rejects an
    /// unknown column in `select` with 400/42703.
    async fn verify_schema(&self) -> Result<(), StoreError> {
        let _: Vec<Value> = self
            .get_rows(
                "game_copies",
                &[("select", COPY_SELECT.to_string()), ("limit", "1".to_string())],
            )
            .await?;
        let _: Vec<Value> = self
            .get_rows(
                "rentals",
                &[("select", RENTAL_SELECT.to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Ok(())
    }

    async fn load_state(&self, scope: Scope) -> Result<StoreState, StoreError> {
        let copies = match scope {
            Scope::All => self.copies(&[]).await?,
            Scope::ReservedOnly => {
                self.copies(&[("status", "neq.AVAILABLE".to_string())])
                    .await?
            }
        };

        // Open rentals are few; scope them client-side instead of an `in.()`
        // filter that grows with the copy list.
        let mut open_rentals = self.open_rentals(&[]).await?;
        if scope == Scope::ReservedOnly {
            let ids: BTreeSet<CopyId> = copies.iter().map(|c| c.copy_id).collect();
            open_rentals.retain(|r| ids.contains(&r.copy_id));
        }

        debug!(
            scope = scope.as_str(),
            copies = copies.len(),
            open_rentals = open_rentals.len(),
            "rest state read"
        );
        Ok(StoreState {
            copies,
            open_rentals,
            read_at: Utc::now(),
        })
    }

    async fn load_copy(&self, copy_id: CopyId) -> Result<CopySnapshot, StoreError> {
        let filter = [("copy_id", format!("eq.{copy_id}"))];
        let copy = self.copies(&filter).await?.into_iter().next();
        let open_rentals = self.open_rentals(&filter).await?;
        Ok(CopySnapshot { copy, open_rentals })
    }
}

#[async_trait::async_trait]
impl TransitionRpc for PostgrestStore {
    async fn rent_copy(
        &self,
        game_id: GameId,
        renter_name: &str,
        user_id: Option<Uuid>,
    ) -> Result<Option<RentalId>, RpcError> {
        let args = json!({
            "p_game_id": game_id,
            "p_renter_name": renter_name,
            "p_user_id": user_id,
        });
        let reply = self.call_procedure(&self.rent_fn, args).await?;
        interpret_procedure_reply(&reply)
    }

    async fn return_copy(&self, game_id: GameId) -> Result<(), RpcError> {
        let reply = self
            .call_procedure(&self.return_fn, json!({ "p_game_id": game_id }))
            .await?;
        interpret_procedure_reply(&reply).map(|_| ())
    }
}
