//! `rentwatch overdue`: the daily briefing. Read-only.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rw_reconcile::{find_expired_dibs, find_overdue, ExpiredDibs, OverdueRental};
use rw_schemas::Scope;
use serde::Serialize;

use super::{notify, open_store, OutputFormat, Runtime};

#[derive(Debug, Serialize)]
pub struct Briefing {
    pub read_at: DateTime<Utc>,
    pub overdue: Vec<OverdueRental>,
    pub expired_dibs: Vec<ExpiredDibs>,
}

pub fn to_text(b: &Briefing) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "briefing read_at={} overdue={} expired_dibs={}",
        b.read_at.to_rfc3339(),
        b.overdue.len(),
        b.expired_dibs.len()
    );
    for o in &b.overdue {
        let _ = writeln!(
            out,
            "overdue rental={} copy={} game={} renter=\"{}\" due={} days={}",
            o.rental_id,
            o.copy_id,
            o.game_id,
            o.renter,
            o.due_at.format("%Y-%m-%d"),
            o.days_overdue
        );
    }
    for d in &b.expired_dibs {
        let _ = writeln!(
            out,
            "expired_dibs rental={} copy={} game={} renter=\"{}\" minutes={}",
            d.rental_id, d.copy_id, d.game_id, d.renter, d.minutes_expired
        );
    }
    out.trim_end().to_string()
}

pub async fn run_overdue(config_paths: &[String], format: OutputFormat, notify_flag: bool) -> Result<()> {
    let rt = Runtime::load(config_paths)?;
    let store = open_store(&rt).await?;

    store.reader.verify_schema().await?;
    // Every open rental, including ones on copies marked AVAILABLE.
    let state = store
        .reader
        .load_state(Scope::All)
        .await
        .context("briefing read failed")?;

    let briefing = Briefing {
        read_at: state.read_at,
        overdue: find_overdue(&state.open_rentals, state.read_at),
        expired_dibs: find_expired_dibs(&state.open_rentals, state.read_at),
    };

    match format {
        OutputFormat::Text => println!("{}", to_text(&briefing)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&briefing).context("briefing serialize failed")?
        ),
    }

    if notify_flag {
        let payload = rw_notify::overdue_briefing(
            &rt.bot_identity(),
            &briefing.overdue,
            &briefing.expired_dibs,
            briefing.read_at,
        );
        notify(rt.secrets.discord.briefing.as_deref(), "overdue_briefing", &payload).await;
    }

    Ok(())
}
