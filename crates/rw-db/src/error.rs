use rw_repair::{RpcError, StoreError};

// Postgres SQLSTATE codes that mean the schema is not what we expect.
const UNDEFINED_COLUMN: &str = "42703";
const UNDEFINED_TABLE: &str = "42P01";
const UNDEFINED_FUNCTION: &str = "42883";
const DATATYPE_MISMATCH: &str = "42804";
// `raise exception` inside a plpgsql procedure.
const RAISE_EXCEPTION: &str = "P0001";

/// Map a read-side sqlx error onto the store taxonomy.
pub fn classify_read_error(err: &sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnNotFound(col) => {
            StoreError::SchemaMismatch(format!("column not found: {col}"))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::SchemaMismatch(format!("column {index}: {source}"))
        }
        sqlx::Error::Decode(e) => StoreError::SchemaMismatch(format!("decode: {e}")),
        sqlx::Error::TypeNotFound { type_name } => {
            StoreError::SchemaMismatch(format!("type not found: {type_name}"))
        }
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNDEFINED_COLUMN | UNDEFINED_TABLE | DATATYPE_MISMATCH) => {
                StoreError::SchemaMismatch(db.message().to_string())
            }
            _ => StoreError::Unavailable(db.message().to_string()),
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}

/// Map a procedure-call sqlx error onto the RPC taxonomy.
pub fn classify_rpc_error(err: &sqlx::Error) -> RpcError {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(RAISE_EXCEPTION) => RpcError::Rejected(db.message().to_string()),
            Some(UNDEFINED_FUNCTION) => {
                RpcError::Transport(format!("procedure not found: {}", db.message()))
            }
            _ => RpcError::Transport(db.message().to_string()),
        },
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RpcError::Decode(err.to_string())
        }
        other => RpcError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_errors_are_unavailable() {
        let io = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(classify_read_error(&io), StoreError::Unavailable(_)));
        assert!(matches!(
            classify_read_error(&sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify_read_error(&sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let e = sqlx::Error::ColumnNotFound("due_date".to_string());
        assert_eq!(
            classify_read_error(&e),
            StoreError::SchemaMismatch("column not found: due_date".to_string())
        );
    }

    #[test]
    fn rpc_transport_errors() {
        assert!(matches!(
            classify_rpc_error(&sqlx::Error::PoolTimedOut),
            RpcError::Transport(_)
        ));
    }
}
