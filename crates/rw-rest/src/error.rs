use reqwest::StatusCode;
use rw_repair::{RpcError, StoreError};
use serde::Deserialize;

/// PostgREST error body. Every field is optional; proxies in front of the
/// API sometimes answer with plain text.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiError {
    pub(crate) fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| ApiError {
            code: None,
            message: Some(body.trim().to_string()).filter(|s| !s.is_empty()),
        })
    }

    fn summary(&self, status: StatusCode) -> String {
        match (&self.code, &self.message) {
            (Some(c), Some(m)) => format!("http {} code={c} {m}", status.as_u16()),
            (None, Some(m)) => format!("http {} {m}", status.as_u16()),
            (Some(c), None) => format!("http {} code={c}", status.as_u16()),
            (None, None) => format!("http {}", status.as_u16()),
        }
    }

    /// Postgres undefined column/table, and PostgREST schema-cache misses.
    fn is_schema_error(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some("42703" | "42P01" | "PGRST200" | "PGRST204" | "PGRST205")
        )
    }
}

pub(crate) fn read_error(status: StatusCode, body: &str) -> StoreError {
    let api = ApiError::parse(body);
    if api.is_schema_error() {
        return StoreError::SchemaMismatch(api.summary(status));
    }
    StoreError::Unavailable(api.summary(status))
}

pub(crate) fn rpc_error(status: StatusCode, body: &str) -> RpcError {
    let api = ApiError::parse(body);
    match api.code.as_deref() {
        // `raise exception` inside the procedure.
        Some("P0001") => RpcError::Rejected(
            api.message
                .clone()
                .unwrap_or_else(|| "procedure raised".to_string()),
        ),
        _ => RpcError::Transport(api.summary(status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_column_is_schema_mismatch() {
        let body = r#"{"code":"42703","details":null,"hint":null,"message":"column rentals.due_date does not exist"}"#;
        assert_eq!(
            read_error(StatusCode::BAD_REQUEST, body),
            StoreError::SchemaMismatch(
                "http 400 code=42703 column rentals.due_date does not exist".to_string()
            )
        );
    }

    #[test]
    fn gateway_errors_are_unavailable() {
        assert_eq!(
            read_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            StoreError::Unavailable("http 502 <html>bad gateway</html>".to_string())
        );
        assert_eq!(
            read_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            StoreError::Unavailable("http 503".to_string())
        );
    }

    #[test]
    fn raised_exception_is_rejection() {
        let body = r#"{"code":"P0001","message":"No available copies"}"#;
        assert_eq!(
            rpc_error(StatusCode::BAD_REQUEST, body),
            RpcError::Rejected("No available copies".to_string())
        );
    }
}
