use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use rw_reconcile::{check_copy, Violation};
use rw_schemas::GameId;
use tracing::{debug, info, warn};

use crate::plan::{manual_review_reason, plan_action};
use crate::ports::{RpcError, StateReader, TransitionRpc};
use crate::report::{Outcome, RepairAction, RepairFailure, RepairItem, RepairReport};

/// Upper bound on concurrent repair groups.
pub const MAX_WORKERS: usize = 8;

#[derive(Clone, Debug)]
pub struct RepairOptions {
    /// Concurrent repair groups; clamped to `1..=MAX_WORKERS`.
    pub workers: usize,
    /// Per-call bound on the transition procedure and on each single-copy re-read.
    pub rpc_timeout: Duration,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            rpc_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives corrective actions for a list of violations.
///
/// One attempt per violation per call. Force-return actions are grouped by
/// game id (the procedure is addressed by game), groups run concurrently up
/// to `workers`, and actions inside a group run in sequence, so a copy never
/// has two repairs in flight. Each copy is read again before its procedure
/// call and again after it.
pub struct RepairOrchestrator<'a> {
    reader: &'a dyn StateReader,
    rpc: &'a dyn TransitionRpc,
    opts: RepairOptions,
}

impl<'a> RepairOrchestrator<'a> {
    pub fn new(reader: &'a dyn StateReader, rpc: &'a dyn TransitionRpc, opts: RepairOptions) -> Self {
        Self { reader, rpc, opts }
    }

    pub async fn repair(&self, violations: &[Violation], dry_run: bool) -> RepairReport {
        let mut outcomes: Vec<Option<Outcome>> = vec![None; violations.len()];
        let actions: Vec<RepairAction> = violations.iter().map(plan_action).collect();
        let mut groups: BTreeMap<GameId, Vec<(usize, &Violation)>> = BTreeMap::new();

        for (idx, (v, action)) in violations.iter().zip(&actions).enumerate() {
            match action {
                RepairAction::ManualReview => {
                    info!(
                        copy_id = v.copy_id(),
                        kind = %v.kind(),
                        "manual review required: {}",
                        v.describe()
                    );
                    outcomes[idx] = Some(Outcome::ManualReview {
                        reason: manual_review_reason(v),
                    });
                }
                RepairAction::ForceReturn { .. } if dry_run => {
                    info!(copy_id = v.copy_id(), "dry run: would {}", action.label());
                    outcomes[idx] = Some(Outcome::Planned);
                }
                RepairAction::ForceReturn { game_id } => {
                    groups.entry(*game_id).or_default().push((idx, v));
                }
            }
        }

        let workers = self.opts.workers.clamp(1, MAX_WORKERS);
        let finished: Vec<Vec<(usize, Outcome)>> = stream::iter(groups.into_values())
            .map(|group| self.run_group(group))
            .buffer_unordered(workers)
            .collect()
            .await;

        for (idx, outcome) in finished.into_iter().flatten() {
            outcomes[idx] = Some(outcome);
        }

        let items = violations
            .iter()
            .zip(actions)
            .zip(outcomes)
            .map(|((v, action), outcome)| RepairItem {
                violation: v.clone(),
                action,
                // Every force-return index belongs to exactly one group.
                outcome: outcome.unwrap_or(Outcome::Unresolved {
                    detail: "no outcome recorded".to_string(),
                }),
            })
            .collect();

        RepairReport { dry_run, items }
    }

    async fn run_group(&self, group: Vec<(usize, &Violation)>) -> Vec<(usize, Outcome)> {
        let mut out = Vec::with_capacity(group.len());
        for (idx, v) in group {
            out.push((idx, self.force_return(v).await));
        }
        out
    }

    async fn force_return(&self, v: &Violation) -> Outcome {
        let copy_id = v.copy_id();
        let game_id = v.game_id();

        // The pass read is not a snapshot; act only on what still reproduces.
        let stale = match self.reread(v).await {
            Recheck::Reproduces(_) => None,
            Recheck::ReadFailed(e) => {
                warn!(copy_id, error = %e, "pre-repair read failed; nothing invoked");
                return Outcome::Unresolved {
                    detail: format!("pre-repair read failed: {e}"),
                };
            }
            Recheck::Clean => Some("stale: no longer reproduces on re-read".to_string()),
            Recheck::Other(found) => Some(format!("stale: re-read shows {} instead", found.kind())),
            Recheck::Missing => Some(format!("stale: copy {copy_id} no longer exists")),
        };
        if let Some(detail) = stale {
            info!(copy_id, game_id, "skipping force return: {detail}");
            return Outcome::Stale { detail };
        }

        debug!(copy_id, game_id, "invoking force return");
        let call = tokio::time::timeout(self.opts.rpc_timeout, self.rpc.return_copy(game_id)).await;
        let cause = match call {
            Ok(Ok(())) => return self.verify(v).await,
            Err(_) => RepairFailure::Timeout,
            Ok(Err(RpcError::Rejected(msg))) => RepairFailure::Rejected(msg),
            Ok(Err(e)) => RepairFailure::Rpc(e.to_string()),
        };

        warn!(copy_id, game_id, cause = ?cause, "repair action failed");
        Outcome::RepairActionFailed { cause }
    }

    /// Re-read the copy and re-run the checker on it.
    async fn verify(&self, v: &Violation) -> Outcome {
        let copy_id = v.copy_id();
        match self.reread(v).await {
            Recheck::ReadFailed(e) => {
                warn!(copy_id, error = %e, "re-check read failed");
                Outcome::Unresolved {
                    detail: format!("re-check failed: {e}"),
                }
            }
            Recheck::Missing => Outcome::Unresolved {
                detail: format!("copy {copy_id} not found on re-check"),
            },
            Recheck::Reproduces(still) => {
                warn!(copy_id, "violation still reproduces after repair");
                Outcome::Unresolved {
                    detail: still.describe(),
                }
            }
            Recheck::Other(other) => {
                // Next pass picks this up.
                warn!(copy_id, kind = %other.kind(), "repair left a different violation");
                Outcome::Resolved
            }
            Recheck::Clean => {
                info!(copy_id, "repair verified");
                Outcome::Resolved
            }
        }
    }

    /// Single-copy read, bounded by the procedure timeout.
    async fn reread(&self, v: &Violation) -> Recheck {
        let copy_id = v.copy_id();
        let read = tokio::time::timeout(self.opts.rpc_timeout, self.reader.load_copy(copy_id)).await;
        let snap = match read {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Recheck::ReadFailed(e.to_string()),
            Err(_) => {
                return Recheck::ReadFailed(format!("timed out after {:?}", self.opts.rpc_timeout))
            }
        };
        let Some(copy) = snap.copy else {
            return Recheck::Missing;
        };
        match check_copy(&copy, &snap.open_rentals) {
            Some(found) if found.kind() == v.kind() => Recheck::Reproduces(found),
            Some(found) => Recheck::Other(found),
            None => Recheck::Clean,
        }
    }
}

/// What a single-copy re-read shows relative to the original violation.
enum Recheck {
    Reproduces(Violation),
    Other(Violation),
    Clean,
    Missing,
    ReadFailed(String),
}

