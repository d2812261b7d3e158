use chrono::{DateTime, Utc};
use rw_reconcile::{
    dangling_rentals, find_expired_dibs, find_overdue, find_violations, ExpiredDibs, OverdueRental,
};
use rw_schemas::{RentalId, Scope};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::orchestrator::{RepairOptions, RepairOrchestrator};
use crate::ports::{StateReader, StoreError, TransitionRpc};
use crate::report::RepairReport;

#[derive(Clone, Debug)]
pub struct PassOptions {
    pub scope: Scope,
    pub dry_run: bool,
    pub repair: RepairOptions,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            scope: Scope::ReservedOnly,
            dry_run: true,
            repair: RepairOptions::default(),
        }
    }
}

/// Structured result of one read-check-repair cycle. Renderers (text, JSON,
/// Discord) all consume this shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub backend: String,
    pub scope: Scope,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    pub copies_read: usize,
    pub open_rentals_read: usize,
    /// Open rentals pointing at copies outside the read.
    pub dangling_rentals: Vec<RentalId>,
    pub overdue: Vec<OverdueRental>,
    pub expired_dibs: Vec<ExpiredDibs>,
    pub repair: RepairReport,
}

impl PassReport {
    pub fn needs_attention(&self) -> bool {
        self.repair.needs_attention()
    }
}

/// Run one reconciliation pass.
///
/// Reader failures abort before any repair is attempted: nothing downstream
/// of a partial read is trustworthy. Repair failures are per item and land in
/// the report.
pub async fn run_pass(
    reader: &dyn StateReader,
    rpc: &dyn TransitionRpc,
    opts: &PassOptions,
) -> Result<PassReport, StoreError> {
    let started_at = Utc::now();

    reader.verify_schema().await?;
    let state = reader.load_state(opts.scope).await?;
    info!(
        backend = reader.backend_name(),
        scope = opts.scope.as_str(),
        copies = state.copies.len(),
        open_rentals = state.open_rentals.len(),
        "state loaded"
    );

    let violations = find_violations(&state.copies, &state.open_rentals);
    let dangling = dangling_rentals(&state.copies, &state.open_rentals);
    if !dangling.is_empty() {
        warn!(rentals = ?dangling, "open rentals reference copies outside the read");
    }
    info!(violations = violations.len(), dry_run = opts.dry_run, "check complete");

    let overdue = find_overdue(&state.open_rentals, state.read_at);
    let expired_dibs = find_expired_dibs(&state.open_rentals, state.read_at);

    let repair = RepairOrchestrator::new(reader, rpc, opts.repair.clone())
        .repair(&violations, opts.dry_run)
        .await;

    let counts = repair.counts();
    info!(
        resolved = counts.resolved,
        unresolved = counts.unresolved,
        failed = counts.failed,
        manual_review = counts.manual_review,
        planned = counts.planned,
        stale = counts.stale,
        "pass complete"
    );

    Ok(PassReport {
        backend: reader.backend_name().to_string(),
        scope: opts.scope,
        dry_run: opts.dry_run,
        started_at,
        finished_at: Utc::now(),
        config_hash: None,
        copies_read: state.copies.len(),
        open_rentals_read: state.open_rentals.len(),
        dangling_rentals: dangling,
        overdue,
        expired_dibs,
        repair,
    })
}
