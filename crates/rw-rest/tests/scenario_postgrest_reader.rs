//! Scenario: the PostgREST reader decodes rows, scopes reads, pages through
//! large tables and classifies failures.

use std::time::Duration;

use httpmock::prelude::*;
use rw_repair::{StateReader, StoreError};
use rw_rest::PostgrestStore;
use rw_schemas::{CopyStatus, RentalKind, Scope};
use serde_json::json;

fn rental(id: i64, copy_id: i64, kind: &str) -> serde_json::Value {
    json!({
        "rental_id": id,
        "copy_id": copy_id,
        "game_id": 40,
        "game_name": "Cascadia",
        "user_id": null,
        "renter_name": "Kim",
        "type": kind,
        "borrowed_at": "2026-02-01T10:00:00+00:00",
        "due_date": "2026-02-15T10:00:00+00:00",
        "returned_at": null
    })
}

#[tokio::test]
async fn reserved_only_filters_copies_and_scopes_rentals() {
    let server = MockServer::start_async().await;

    let copies = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/game_copies")
                .query_param("status", "neq.AVAILABLE")
                .query_param("order", "copy_id.asc")
                .header("apikey", "anon-test")
                .header("authorization", "Bearer anon-test");
            then.status(200).json_body(json!([
                {"copy_id": 1, "game_id": 40, "status": "RESERVED"},
                {"copy_id": 2, "game_id": 40, "status": "RENTED"}
            ]));
        })
        .await;
    let rentals = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rentals")
                .query_param("returned_at", "is.null");
            then.status(200)
                .json_body(json!([rental(7, 1, "DIBS"), rental(8, 9, "RENT")]));
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "anon-test".to_string());
    let state = store.load_state(Scope::ReservedOnly).await.unwrap();

    copies.assert_async().await;
    rentals.assert_async().await;
    assert_eq!(state.copies.len(), 2);
    assert_eq!(state.copies[1].status, CopyStatus::Rented);
    // Rental 8 references copy 9, which is outside the scoped read.
    assert_eq!(state.open_rentals.len(), 1);
    assert_eq!(state.open_rentals[0].kind, RentalKind::Dibs);
    assert_eq!(state.open_rentals[0].renter.label(), "Kim");
}

#[tokio::test]
async fn reads_page_until_a_short_page() {
    let server = MockServer::start_async().await;

    let first = server
        .mock_async(|when, then| {
            when.method(GET).path("/game_copies").query_param("offset", "0");
            then.status(200).json_body(json!([
                {"copy_id": 1, "game_id": 1, "status": "AVAILABLE"},
                {"copy_id": 2, "game_id": 1, "status": "AVAILABLE"}
            ]));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET).path("/game_copies").query_param("offset", "2");
            then.status(200)
                .json_body(json!([{"copy_id": 3, "game_id": 2, "status": "RESERVED"}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rentals");
            then.status(200).json_body(json!([]));
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "k".to_string())
        .with_page_size(2);
    let state = store.load_state(Scope::All).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    let ids: Vec<i64> = state.copies.iter().map(|c| c.copy_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn missing_column_is_schema_mismatch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/game_copies");
            then.status(200).json_body(json!([]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rentals");
            then.status(400).json_body(json!({
                "code": "42703",
                "details": null,
                "hint": null,
                "message": "column rentals.due_date does not exist"
            }));
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "k".to_string());
    let err = store.verify_schema().await.unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("rentals.due_date"));
}

#[tokio::test]
async fn unknown_status_literal_is_schema_mismatch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/game_copies");
            then.status(200)
                .json_body(json!([{"copy_id": 1, "game_id": 1, "status": "LOST"}]));
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "k".to_string());
    let err = store.load_state(Scope::All).await.unwrap_err();

    assert_eq!(
        err,
        StoreError::SchemaMismatch("unknown game_copies.status literal: \"LOST\"".to_string())
    );
}

#[tokio::test]
async fn server_errors_are_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/game_copies");
            then.status(503).body("upstream connect error");
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "k".to_string());
    let err = store.load_state(Scope::ReservedOnly).await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn slow_server_is_unavailable_after_the_request_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/game_copies");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!([]));
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "k".to_string())
        .with_request_timeout(Duration::from_millis(100));
    let err = store.load_copy(5).await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
}

#[tokio::test]
async fn load_copy_reads_one_copy_and_its_open_rentals() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/game_copies")
                .query_param("copy_id", "eq.5");
            then.status(200)
                .json_body(json!([{"copy_id": 5, "game_id": 40, "status": "AVAILABLE"}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rentals").query_param("copy_id", "eq.5");
            then.status(200).json_body(json!([]));
        })
        .await;

    let store = PostgrestStore::new_with_base_url(server.base_url(), "k".to_string());
    let snap = store.load_copy(5).await.unwrap();

    assert_eq!(snap.copy.unwrap().status, CopyStatus::Available);
    assert!(snap.open_rentals.is_empty());
}
