use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rw_repair::{CopySnapshot, RpcError, StateReader, StoreError, TransitionRpc};
use rw_schemas::{
    CopyId, CopyStatus, GameCopy, GameId, Rental, RentalId, RentalKind, Renter, Scope, StoreState,
};
use uuid::Uuid;

/// Scripted misbehaviour of the transition procedures for one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Never answers; the caller's timeout must fire.
    Hang,
    /// Answers `success: false` with this message.
    Reject(String),
    Transport(String),
    /// Answers success but changes nothing.
    NoOp,
    /// Answers success after deleting this copy instead of returning it.
    RemoveCopy(CopyId),
    /// Answers success after only setting this copy's status; rentals stay open.
    SetStatus(CopyId, CopyStatus),
    /// Returns the copy normally, then every later read fails with this error.
    ThenFailReads(StoreError),
}

#[derive(Default)]
struct Inner {
    copies: BTreeMap<CopyId, GameCopy>,
    rentals: Vec<Rental>,
    faults: HashMap<GameId, Fault>,
    read_fault: Option<StoreError>,
    copy_read_fault: Option<StoreError>,
    next_rental_id: RentalId,

    return_calls: Vec<GameId>,
    rent_calls: Vec<GameId>,
    in_flight: usize,
    in_flight_by_game: HashMap<GameId, usize>,
    max_in_flight: usize,
    max_in_flight_same_game: usize,
}

/// In-memory store used ONLY for tests.
///
/// Implements both the reader and the transition procedures with the same
/// observable effects as the production procedures: a force return moves
/// one copy of the game to AVAILABLE and closes its open rentals.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    latency: Duration,
    copy_read_latency: Duration,
    clock: Option<DateTime<Utc>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a> {
    store: &'a InMemoryStore,
    game_id: GameId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut g = self.store.state();
        g.in_flight = g.in_flight.saturating_sub(1);
        if let Some(n) = g.in_flight_by_game.get_mut(&self.game_id) {
            *n = n.saturating_sub(1);
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_rental_id: 1,
                ..Inner::default()
            }),
            latency: Duration::ZERO,
            copy_read_latency: Duration::ZERO,
            clock: None,
        }
    }

    pub fn with_copy(self, copy: GameCopy) -> Self {
        self.state().copies.insert(copy.copy_id, copy);
        self
    }

    pub fn with_rental(self, rental: Rental) -> Self {
        {
            let mut g = self.state();
            g.next_rental_id = g.next_rental_id.max(rental.rental_id + 1);
            g.rentals.push(rental);
        }
        self
    }

    /// Simulated duration of every procedure call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Simulated duration of every single-copy read.
    pub fn with_copy_read_latency(mut self, latency: Duration) -> Self {
        self.copy_read_latency = latency;
        self
    }

    /// Pin `read_at` for deterministic overdue output.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn fail_game(self, game_id: GameId, fault: Fault) -> Self {
        self.state().faults.insert(game_id, fault);
        self
    }

    /// Make every read fail with `err`.
    pub fn fail_reads(self, err: StoreError) -> Self {
        self.state().read_fault = Some(err);
        self
    }

    /// Make only single-copy reads fail; full reads still succeed.
    pub fn fail_copy_reads(self, err: StoreError) -> Self {
        self.state().copy_read_fault = Some(err);
        self
    }

    pub fn copy(&self, copy_id: CopyId) -> Option<GameCopy> {
        self.state().copies.get(&copy_id).cloned()
    }

    pub fn open_rentals_of(&self, copy_id: CopyId) -> Vec<Rental> {
        self.state()
            .rentals
            .iter()
            .filter(|r| r.copy_id == copy_id && r.is_open())
            .cloned()
            .collect()
    }

    /// Game ids passed to `return_copy`, in call order.
    pub fn return_calls(&self) -> Vec<GameId> {
        self.state().return_calls.clone()
    }

    pub fn rent_calls(&self) -> Vec<GameId> {
        self.state().rent_calls.clone()
    }

    pub fn rpc_call_count(&self) -> usize {
        let g = self.state();
        g.return_calls.len() + g.rent_calls.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    /// Highest number of concurrent calls observed for any single game.
    pub fn max_in_flight_same_game(&self) -> usize {
        self.state().max_in_flight_same_game
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not cascade into every other assertion.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    fn read_guard(&self) -> Result<(), StoreError> {
        match &self.state().read_fault {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn enter(&self, game_id: GameId) -> InFlight<'_> {
        let mut g = self.state();
        g.in_flight += 1;
        g.max_in_flight = g.max_in_flight.max(g.in_flight);
        let per_game = {
            let n = g.in_flight_by_game.entry(game_id).or_insert(0);
            *n += 1;
            *n
        };
        g.max_in_flight_same_game = g.max_in_flight_same_game.max(per_game);
        InFlight {
            store: self,
            game_id,
        }
    }

    async fn simulate_call(&self, game_id: GameId) -> Result<Option<Fault>, RpcError> {
        let fault = self.state().faults.get(&game_id).cloned();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match fault {
            Some(Fault::Hang) => {
                std::future::pending::<()>().await;
                Ok(None)
            }
            Some(Fault::Reject(msg)) => Err(RpcError::Rejected(msg)),
            Some(Fault::Transport(msg)) => Err(RpcError::Transport(msg)),
            other => Ok(other),
        }
    }
}

#[async_trait::async_trait]
impl StateReader for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn verify_schema(&self) -> Result<(), StoreError> {
        self.read_guard()
    }

    async fn load_state(&self, scope: Scope) -> Result<StoreState, StoreError> {
        self.read_guard()?;
        let g = self.state();
        let copies: Vec<GameCopy> = g
            .copies
            .values()
            .filter(|c| scope == Scope::All || !c.status.is_available())
            .cloned()
            .collect();
        let open_rentals = g
            .rentals
            .iter()
            .filter(|r| r.is_open())
            .filter(|r| scope == Scope::All || copies.iter().any(|c| c.copy_id == r.copy_id))
            .cloned()
            .collect();
        Ok(StoreState {
            copies,
            open_rentals,
            read_at: self.now(),
        })
    }

    async fn load_copy(&self, copy_id: CopyId) -> Result<CopySnapshot, StoreError> {
        if !self.copy_read_latency.is_zero() {
            tokio::time::sleep(self.copy_read_latency).await;
        }
        self.read_guard()?;
        if let Some(e) = self.state().copy_read_fault.clone() {
            return Err(e);
        }
        Ok(CopySnapshot {
            copy: self.copy(copy_id),
            open_rentals: self.open_rentals_of(copy_id),
        })
    }
}

#[async_trait::async_trait]
impl TransitionRpc for InMemoryStore {
    async fn rent_copy(
        &self,
        game_id: GameId,
        renter_name: &str,
        user_id: Option<Uuid>,
    ) -> Result<Option<RentalId>, RpcError> {
        self.state().rent_calls.push(game_id);
        let _guard = self.enter(game_id);
        if self.simulate_call(game_id).await? == Some(Fault::NoOp) {
            return Ok(None);
        }

        let now = self.now();
        let mut g = self.state();
        let Some(copy_id) = g
            .copies
            .values()
            .find(|c| c.game_id == game_id && c.status.is_available())
            .map(|c| c.copy_id)
        else {
            return Err(RpcError::Rejected(format!(
                "no available copy of game {game_id}"
            )));
        };

        let rental_id = g.next_rental_id;
        g.next_rental_id += 1;
        let game_name = g.copies.get(&copy_id).and_then(|c| c.game_name.clone());
        if let Some(c) = g.copies.get_mut(&copy_id) {
            c.status = CopyStatus::Rented;
        }
        g.rentals.push(Rental {
            rental_id,
            copy_id,
            game_id,
            game_name,
            renter: Renter {
                user_id,
                name: Some(renter_name.to_string()),
            },
            kind: RentalKind::Rent,
            borrowed_at: now,
            due_at: Some(now + chrono::Duration::days(14)),
            returned_at: None,
        });
        Ok(Some(rental_id))
    }

    async fn return_copy(&self, game_id: GameId) -> Result<(), RpcError> {
        self.state().return_calls.push(game_id);
        let _guard = self.enter(game_id);
        let fault = self.simulate_call(game_id).await?;

        let now = self.now();
        let mut g = self.state();
        match &fault {
            Some(Fault::NoOp) => return Ok(()),
            Some(Fault::RemoveCopy(copy_id)) => {
                g.copies.remove(copy_id);
                return Ok(());
            }
            Some(Fault::SetStatus(copy_id, status)) => {
                if let Some(c) = g.copies.get_mut(copy_id) {
                    c.status = *status;
                }
                return Ok(());
            }
            _ => {}
        }

        // Lowest held copy of the game first, then any copy with a lingering rental.
        let target = {
            let inner: &Inner = &g;
            inner
                .copies
                .values()
                .find(|c| c.game_id == game_id && !c.status.is_available())
                .or_else(|| {
                    inner.copies.values().find(|c| {
                        c.game_id == game_id
                            && inner
                                .rentals
                                .iter()
                                .any(|r| r.copy_id == c.copy_id && r.is_open())
                    })
                })
                .map(|c| c.copy_id)
        };

        let Some(copy_id) = target else {
            return Err(RpcError::Rejected(format!(
                "no rented copy found for game {game_id}"
            )));
        };

        if let Some(c) = g.copies.get_mut(&copy_id) {
            c.status = CopyStatus::Available;
        }
        for r in g.rentals.iter_mut().filter(|r| r.copy_id == copy_id && r.is_open()) {
            r.returned_at = Some(now);
        }
        if let Some(Fault::ThenFailReads(e)) = fault {
            g.read_fault = Some(e);
        }
        Ok(())
    }
}
