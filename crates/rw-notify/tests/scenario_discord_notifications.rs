use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use rw_notify::{
    overdue_briefing, pass_alert, BotIdentity, DiscordNotifier, NotifyError, COLOR_ORANGE,
    COLOR_RED,
};
use rw_reconcile::{OverdueRental, Violation};
use rw_repair::{
    Outcome, PassReport, RepairAction, RepairFailure, RepairItem, RepairReport,
};
use rw_schemas::{CopyStatus, RentalKind, Scope};
use serde_json::json;

fn bot() -> BotIdentity {
    BotIdentity {
        username: "Front Desk".to_string(),
        avatar_url: None,
    }
}

fn report(items: Vec<RepairItem>) -> PassReport {
    let t = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
    PassReport {
        backend: "memory".to_string(),
        scope: Scope::ReservedOnly,
        dry_run: false,
        started_at: t,
        finished_at: t,
        config_hash: None,
        copies_read: 3,
        open_rentals_read: 1,
        dangling_rentals: vec![],
        overdue: vec![],
        expired_dibs: vec![],
        repair: RepairReport {
            dry_run: false,
            items,
        },
    }
}

fn orphan(copy_id: i64, outcome: Outcome) -> RepairItem {
    RepairItem {
        violation: Violation::OrphanedReservation {
            copy_id,
            game_id: 8,
            status: CopyStatus::Reserved,
        },
        action: RepairAction::ForceReturn { game_id: 8 },
        outcome,
    }
}

#[test]
fn clean_pass_sends_nothing() {
    let r = report(vec![orphan(1, Outcome::Resolved)]);
    assert!(pass_alert(&bot(), &r).is_none());
}

#[test]
fn failed_items_raise_a_red_alert() {
    let r = report(vec![
        orphan(1, Outcome::Resolved),
        orphan(
            2,
            Outcome::RepairActionFailed {
                cause: RepairFailure::Timeout,
            },
        ),
    ]);
    let p = pass_alert(&bot(), &r).unwrap();
    let e = &p.embeds[0];

    assert_eq!(p.username, "Front Desk");
    assert_eq!(e.color, COLOR_RED);
    assert_eq!(e.fields.len(), 1);
    assert_eq!(e.fields[0].name, "1. ORPHANED_RESERVATION copy 2");
    assert!(e.fields[0].value.contains("REPAIR_ACTION_FAILED: Timeout"));
}

#[test]
fn manual_review_only_is_orange() {
    let r = report(vec![RepairItem {
        violation: Violation::StatusMismatch {
            copy_id: 4,
            game_id: 2,
            status: CopyStatus::Rented,
            rental_id: 31,
            rental_kind: RentalKind::Dibs,
        },
        action: RepairAction::ManualReview,
        outcome: Outcome::ManualReview {
            reason: "operator decides".to_string(),
        },
    }]);
    let p = pass_alert(&bot(), &r).unwrap();
    assert_eq!(p.embeds[0].color, COLOR_ORANGE);
}

#[test]
fn briefing_lists_overdue_with_day_count() {
    let now = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
    let overdue = vec![OverdueRental {
        rental_id: 70,
        copy_id: 1,
        game_id: 1,
        game_name: Some("Azul".to_string()),
        renter: "Kim".to_string(),
        due_at: Utc.with_ymd_and_hms(2026, 4, 28, 18, 0, 0).unwrap(),
        days_overdue: 3,
    }];

    let p = overdue_briefing(&bot(), &overdue, &[], now);
    let e = &p.embeds[0];

    assert_eq!(e.title, "Overdue briefing (2026-05-02)");
    assert_eq!(e.color, COLOR_RED);
    assert_eq!(e.fields[0].name, "1. Azul");
    assert_eq!(
        e.fields[0].value,
        "**Kim**\ndue 2026-04-28 (D+3 days overdue)"
    );

    let wire = serde_json::to_value(&p).unwrap();
    assert!(wire.get("avatar_url").is_none());
    assert_eq!(wire["embeds"][0]["fields"][0]["inline"], json!(false));
}

#[tokio::test]
async fn send_posts_json_to_the_webhook() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/webhooks/1/tok")
                .json_body_partial(r#"{"username": "Front Desk"}"#);
            then.status(204);
        })
        .await;

    let now = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
    let notifier = DiscordNotifier::new(server.url("/api/webhooks/1/tok"));
    notifier
        .send(&overdue_briefing(&bot(), &[], &[], now))
        .await
        .unwrap();
    m.assert_async().await;
}

#[tokio::test]
async fn webhook_rejection_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(400).body("Invalid Form Body");
        })
        .await;

    let notifier = DiscordNotifier::new(server.url("/hook"));
    let now = Utc.with_ymd_and_hms(2026, 5, 2, 8, 0, 0).unwrap();
    let err = notifier
        .send(&overdue_briefing(&bot(), &[], &[], now))
        .await
        .unwrap_err();

    match err {
        NotifyError::Api { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "Invalid Form Body");
        }
        other => panic!("expected api error, got {other}"),
    }
    let dbg = format!("{notifier:?}");
    assert!(!dbg.contains("/hook"));
}
