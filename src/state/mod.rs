pub mod case;
pub mod machine;
mod sse;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{error::ServiceError, oracle::Oracle, store::StoreAdapter};

pub use self::sse::EventHub;
use self::{
    case::{CaseSession, Difficulty},
    machine::{GameEvent, Plan, PlanId, Screen, ScreenSnapshot, ScreenStateMachine},
};

pub type SharedState = Arc<AppState>;

/// Upper bound on a single oracle-backed action, fallback attempts included.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between a correct guess being recorded and the screen moving to the
/// finished view, so the player sees the verdict land in the transcript.
pub const SOLVED_DISPLAY_DELAY: Duration = Duration::from_millis(1200);

/// The last oracle-backed action that failed, kept so the player can retry
/// it without retyping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// Puzzle generation at this difficulty.
    Start(Difficulty),
    /// A yes/no question.
    Ask(String),
    /// A solution guess.
    Solve(String),
    /// A hint request.
    Hint,
}

/// Central application state: screen machine, live case, persistence handle
/// and the oracle client.
pub struct AppState {
    store: StoreAdapter,
    oracle: Arc<dyn Oracle>,
    screen: RwLock<ScreenStateMachine>,
    session: RwLock<Option<CaseSession>>,
    retry: RwLock<Option<RetryAction>>,
    last_difficulty: RwLock<Option<Difficulty>>,
    draft_input: RwLock<Option<String>>,
    events: EventHub,
    degraded: watch::Sender<bool>,
    action_gate: Mutex<()>,
    action_timeout: Duration,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply. Starts on the menu screen, not degraded.
    pub fn new(store: StoreAdapter, oracle: Arc<dyn Oracle>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            store,
            oracle,
            screen: RwLock::new(ScreenStateMachine::new()),
            session: RwLock::new(None),
            retry: RwLock::new(None),
            last_difficulty: RwLock::new(None),
            draft_input: RwLock::new(None),
            events: EventHub::new(16),
            degraded: degraded_tx,
            action_gate: Mutex::new(()),
            action_timeout: DEFAULT_ACTION_TIMEOUT,
        })
    }

    /// Persistence handle.
    pub fn store(&self) -> &StoreAdapter {
        &self.store
    }

    /// Oracle client.
    pub fn oracle(&self) -> Arc<dyn Oracle> {
        Arc::clone(&self.oracle)
    }

    /// Broadcast hub for the SSE stream.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Currently active case, if a puzzle is loaded.
    pub fn session(&self) -> &RwLock<Option<CaseSession>> {
        &self.session
    }

    /// Difficulty of the most recently started case, used for "next case".
    pub fn last_difficulty(&self) -> &RwLock<Option<Difficulty>> {
        &self.last_difficulty
    }

    /// Unsent player input, preserved across snapshot and restore.
    pub fn draft_input(&self) -> &RwLock<Option<String>> {
        &self.draft_input
    }

    /// Put the machine on a given screen and install a case, used when a
    /// session snapshot is restored at startup.
    pub async fn resume(&self, screen: Screen, case: Option<CaseSession>) {
        *self.screen.write().await = ScreenStateMachine::resumed_at(screen);
        *self.session.write().await = case;
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Record the outcome of a persistence write and broadcast the degraded
    /// flag when it flips.
    pub fn note_store_write(&self, ok: bool) {
        self.degraded.send_if_modified(|degraded| {
            if *degraded == !ok {
                false
            } else {
                *degraded = !ok;
                true
            }
        });
    }

    /// Snapshot of the screen machine: screen, version and in-flight event.
    pub async fn screen_snapshot(&self) -> ScreenSnapshot {
        self.screen.read().await.snapshot()
    }

    /// Current screen.
    pub async fn current_screen(&self) -> Screen {
        self.screen.read().await.screen()
    }

    /// Remember a failed action so it can be retried.
    pub async fn set_retry(&self, action: RetryAction) {
        *self.retry.write().await = Some(action);
    }

    /// Take the retry slot, clearing it.
    pub async fn take_retry(&self) -> Option<RetryAction> {
        self.retry.write().await.take()
    }

    /// Clear the retry slot, e.g. after any action succeeds.
    pub async fn clear_retry(&self) {
        *self.retry.write().await = None;
    }

    /// Peek at the retry slot without consuming it.
    pub async fn peek_retry(&self) -> Option<RetryAction> {
        self.retry.read().await.clone()
    }

    /// Apply an event that needs no asynchronous work, committing in one
    /// step under the machine lock.
    pub async fn transition(&self, event: GameEvent) -> Result<Screen, ServiceError> {
        let mut machine = self.screen.write().await;
        let plan = machine.plan(event)?;
        Ok(machine.apply(plan.id)?)
    }

    async fn plan_transition(&self, event: GameEvent) -> Result<Plan, machine::PlanError> {
        let mut machine = self.screen.write().await;
        machine.plan(event)
    }

    async fn apply_planned_transition(
        &self,
        plan_id: PlanId,
    ) -> Result<Screen, machine::ApplyError> {
        let mut machine = self.screen.write().await;
        machine.apply(plan_id)
    }

    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), machine::AbortError> {
        let mut machine = self.screen.write().await;
        machine.abort(plan_id)
    }

    /// Run an oracle-backed transition: plan the event, run `work` under the
    /// action timeout, apply on success, abort on failure or timeout.
    ///
    /// The gate rejects rather than queues: while one action is in flight,
    /// every further action fails fast with [`ServiceError::ActionInFlight`].
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: GameEvent,
        work: F,
    ) -> Result<(T, Screen), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let Ok(gate) = self.action_gate.try_lock() else {
            return Err(ServiceError::ActionInFlight);
        };
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        let outcome = match timeout(self.action_timeout, work()).await {
            Ok(result) => result,
            Err(_) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after timeout"
                    );
                }
                drop(gate);
                return Err(ServiceError::Timeout);
            }
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}
