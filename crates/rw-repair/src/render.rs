//! Plain renderers for [`PassReport`].

use std::fmt::Write as _;

use crate::pass::PassReport;
use crate::report::{Outcome, RepairFailure};

/// Pretty JSON, one document per pass.
pub fn to_json(report: &PassReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn outcome_detail(o: &Outcome) -> Option<String> {
    match o {
        Outcome::Planned | Outcome::Resolved => None,
        Outcome::Unresolved { detail } | Outcome::Stale { detail } => Some(detail.clone()),
        Outcome::ManualReview { reason } => Some(reason.clone()),
        Outcome::RepairActionFailed { cause } => Some(match cause {
            RepairFailure::Timeout => "Timeout".to_string(),
            RepairFailure::Rejected(m) => format!("Rejected: {m}"),
            RepairFailure::Rpc(m) => format!("Rpc: {m}"),
        }),
    }
}

/// `key=value` text, one violation per line.
pub fn to_text(report: &PassReport) -> String {
    let mut s = String::new();
    let c = report.repair.counts();

    // Writing into a String cannot fail.
    let _ = writeln!(
        s,
        "pass backend={} scope={} dry_run={} copies={} open_rentals={}",
        report.backend,
        report.scope.as_str(),
        report.dry_run,
        report.copies_read,
        report.open_rentals_read
    );
    if let Some(h) = &report.config_hash {
        let _ = writeln!(s, "config_hash={h}");
    }
    let _ = writeln!(
        s,
        "violations={} planned={} resolved={} unresolved={} failed={} manual_review={} stale={}",
        c.violations, c.planned, c.resolved, c.unresolved, c.failed, c.manual_review, c.stale
    );

    for (n, item) in report.repair.items.iter().enumerate() {
        let v = &item.violation;
        let _ = writeln!(
            s,
            "[{}] {} copy={} game={} action=\"{}\" outcome={}",
            n + 1,
            v.kind(),
            v.copy_id(),
            v.game_id(),
            item.action.label(),
            item.outcome.label()
        );
        let _ = writeln!(s, "    {}", v.describe());
        if let Some(d) = outcome_detail(&item.outcome) {
            let _ = writeln!(s, "    {d}");
        }
    }

    if !report.dangling_rentals.is_empty() {
        let _ = writeln!(s, "dangling_rentals={:?}", report.dangling_rentals);
    }
    for o in &report.overdue {
        let _ = writeln!(
            s,
            "overdue rental={} copy={} game=\"{}\" renter=\"{}\" due={} days={}",
            o.rental_id,
            o.copy_id,
            o.game_name.as_deref().unwrap_or(""),
            o.renter,
            o.due_at.to_rfc3339(),
            o.days_overdue
        );
    }
    for d in &report.expired_dibs {
        let _ = writeln!(
            s,
            "expired_dibs rental={} copy={} game=\"{}\" renter=\"{}\" due={} minutes={}",
            d.rental_id,
            d.copy_id,
            d.game_name.as_deref().unwrap_or(""),
            d.renter,
            d.due_at.to_rfc3339(),
            d.minutes_expired
        );
    }

    let _ = writeln!(s, "needs_attention={}", report.needs_attention());
    s
}
