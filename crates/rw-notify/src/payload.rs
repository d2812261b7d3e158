use chrono::{DateTime, Utc};
use rw_reconcile::{ExpiredDibs, OverdueRental};
use rw_repair::{Outcome, PassReport, RepairItem};
use serde::{Deserialize, Serialize};

pub const COLOR_RED: u32 = 15_158_332;
pub const COLOR_ORANGE: u32 = 15_105_570;

/// Discord allows at most 25 fields per embed and 1024 chars per value.
pub const MAX_FIELDS: usize = 25;
const MAX_VALUE_CHARS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: Footer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub text: String,
}

/// Display identity of the webhook message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub username: String,
    pub avatar_url: Option<String>,
}

fn truncate(s: String, max: usize) -> String {
    if s.chars().count() <= max {
        return s;
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn field(name: String, value: String) -> EmbedField {
    EmbedField {
        name: truncate(name, 256),
        value: truncate(value, MAX_VALUE_CHARS),
        inline: false,
    }
}

/// Keep the first `MAX_FIELDS - 1` fields and summarise the rest in one.
fn cap_fields(mut fields: Vec<EmbedField>) -> Vec<EmbedField> {
    if fields.len() <= MAX_FIELDS {
        return fields;
    }
    let hidden = fields.len() - (MAX_FIELDS - 1);
    fields.truncate(MAX_FIELDS - 1);
    fields.push(field(
        format!("+{hidden} more"),
        "see the full report".to_string(),
    ));
    fields
}

fn footer() -> Footer {
    Footer {
        text: "rentwatch".to_string(),
    }
}

fn game_label(name: &Option<String>, game_id: i64) -> String {
    match name.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => format!("game {game_id}"),
    }
}

/// Overdue loans and expired DIBS holds as one red embed.
pub fn overdue_briefing(
    bot: &BotIdentity,
    overdue: &[OverdueRental],
    expired_dibs: &[ExpiredDibs],
    now: DateTime<Utc>,
) -> WebhookPayload {
    let mut fields: Vec<EmbedField> = Vec::new();

    for (n, o) in overdue.iter().enumerate() {
        fields.push(field(
            format!("{}. {}", n + 1, game_label(&o.game_name, o.game_id)),
            format!(
                "**{}**\ndue {} (D+{} days overdue)",
                o.renter,
                o.due_at.format("%Y-%m-%d"),
                o.days_overdue
            ),
        ));
    }
    for d in expired_dibs {
        fields.push(field(
            format!("DIBS: {}", game_label(&d.game_name, d.game_id)),
            format!(
                "**{}**\nhold expired {} min ago (copy {})",
                d.renter, d.minutes_expired, d.copy_id
            ),
        ));
    }

    WebhookPayload {
        username: bot.username.clone(),
        avatar_url: bot.avatar_url.clone(),
        embeds: vec![Embed {
            title: format!("Overdue briefing ({})", now.format("%Y-%m-%d")),
            description: format!(
                "**{}** overdue rental(s), **{}** expired DIBS hold(s).",
                overdue.len(),
                expired_dibs.len()
            ),
            color: COLOR_RED,
            fields: cap_fields(fields),
            footer: footer(),
        }],
    }
}

fn item_field(n: usize, item: &RepairItem) -> EmbedField {
    let v = &item.violation;
    let detail = match &item.outcome {
        Outcome::Unresolved { detail } | Outcome::Stale { detail } => detail.clone(),
        Outcome::ManualReview { reason } => reason.clone(),
        Outcome::RepairActionFailed { cause } => format!("{cause:?}"),
        Outcome::Planned | Outcome::Resolved => item.action.label(),
    };
    field(
        format!("{}. {} copy {}", n, v.kind(), v.copy_id()),
        format!("{}\n{}: {}", v.describe(), item.outcome.label(), detail),
    )
}

/// Items that need a person: unresolved, failed, or routed to manual review.
/// `None` when there is nothing to report.
pub fn pass_alert(bot: &BotIdentity, report: &PassReport) -> Option<WebhookPayload> {
    let flagged: Vec<&RepairItem> = report
        .repair
        .items
        .iter()
        .filter(|i| i.needs_attention() || matches!(i.outcome, Outcome::ManualReview { .. }))
        .collect();
    if flagged.is_empty() {
        return None;
    }

    let c = report.repair.counts();
    let fields = flagged
        .iter()
        .enumerate()
        .map(|(n, item)| item_field(n + 1, item))
        .collect();
    let color = if report.needs_attention() {
        COLOR_RED
    } else {
        COLOR_ORANGE
    };

    Some(WebhookPayload {
        username: bot.username.clone(),
        avatar_url: bot.avatar_url.clone(),
        embeds: vec![Embed {
            title: format!(
                "Inventory reconciliation ({}, {})",
                report.scope.as_str(),
                if report.dry_run { "dry run" } else { "live" }
            ),
            description: format!(
                "{} violation(s): {} resolved, {} unresolved, {} failed, {} manual review.",
                c.violations, c.resolved, c.unresolved, c.failed, c.manual_review
            ),
            color,
            fields: cap_fields(fields),
            footer: footer(),
        }],
    })
}
