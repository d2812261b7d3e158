use rw_reconcile::Violation;
use rw_schemas::GameId;
use serde::{Deserialize, Serialize};

/// Corrective action chosen for a violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepairAction {
    /// Invoke the force-return procedure for the copy's game.
    ForceReturn { game_id: GameId },
    /// Never auto-resolved; an operator decides.
    ManualReview,
}

impl RepairAction {
    pub fn label(&self) -> String {
        match self {
            RepairAction::ForceReturn { game_id } => format!("force_return(game={game_id})"),
            RepairAction::ManualReview => "skipped: manual review required".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepairFailure {
    Timeout,
    Rejected(String),
    Rpc(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Dry run: the action was computed but not invoked.
    Planned,
    Resolved,
    /// The procedure succeeded but the re-check still shows the violation.
    Unresolved { detail: String },
    RepairActionFailed { cause: RepairFailure },
    ManualReview { reason: String },
    /// The pre-repair re-read no longer shows the violation; nothing invoked.
    Stale { detail: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Planned => "PLANNED",
            Outcome::Resolved => "RESOLVED",
            Outcome::Unresolved { .. } => "UNRESOLVED",
            Outcome::RepairActionFailed { .. } => "REPAIR_ACTION_FAILED",
            Outcome::ManualReview { .. } => "MANUAL_REVIEW",
            Outcome::Stale { .. } => "STALE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairItem {
    pub violation: Violation,
    pub action: RepairAction,
    pub outcome: Outcome,
}

impl RepairItem {
    /// Unresolved and failed items keep the process exit code non-zero.
    pub fn needs_attention(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Unresolved { .. } | Outcome::RepairActionFailed { .. }
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCounts {
    pub violations: usize,
    pub planned: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub manual_review: usize,
    pub stale: usize,
}

/// Every violation found in a pass, in checker order, with its action and
/// outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub dry_run: bool,
    pub items: Vec<RepairItem>,
}

impl RepairReport {
    pub fn needs_attention(&self) -> bool {
        self.items.iter().any(RepairItem::needs_attention)
    }

    pub fn has_manual_review(&self) -> bool {
        self.items
            .iter()
            .any(|i| matches!(i.outcome, Outcome::ManualReview { .. }))
    }

    pub fn counts(&self) -> RepairCounts {
        let mut c = RepairCounts {
            violations: self.items.len(),
            ..RepairCounts::default()
        };
        for item in &self.items {
            match item.outcome {
                Outcome::Planned => c.planned += 1,
                Outcome::Resolved => c.resolved += 1,
                Outcome::Unresolved { .. } => c.unresolved += 1,
                Outcome::RepairActionFailed { .. } => c.failed += 1,
                Outcome::ManualReview { .. } => c.manual_review += 1,
                Outcome::Stale { .. } => c.stale += 1,
            }
        }
        c
    }
}
