use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Screens the game UI can be on. The server is the source of truth so a
/// reloading frontend can always resynchronise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    /// Main menu, difficulty selection.
    Menu,
    /// Static rules page.
    Rules,
    /// Archive of finished cases.
    History,
    /// Waiting for the oracle to generate a puzzle.
    Loading,
    /// Active case, questions and guesses accepted.
    Playing,
    /// Case over; the truth is revealed.
    Finished,
}

/// Side-navigation destinations reachable without touching game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavTarget {
    /// Back to the main menu.
    Menu,
    /// Rules page.
    Rules,
    /// History page.
    History,
}

impl NavTarget {
    /// Screen a navigation target lands on.
    pub fn screen(self) -> Screen {
        match self {
            NavTarget::Menu => Screen::Menu,
            NavTarget::Rules => Screen::Rules,
            NavTarget::History => Screen::History,
        }
    }
}

/// Events that drive the screen state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Side navigation between menu, rules and history.
    Navigate(NavTarget),
    /// A new case was requested; puzzle generation is about to start.
    CaseRequested,
    /// Puzzle generation succeeded.
    CaseReady,
    /// Puzzle generation failed; fall back to the menu.
    CaseFailed,
    /// A question, guess or hint round-trip is in flight.
    Interact,
    /// A guess was judged correct.
    Solved,
    /// The player gave up.
    Surrendered,
}

/// Returned when an event cannot be applied from the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while on the {from:?} screen")]
pub struct InvalidTransition {
    /// Screen the machine was on.
    pub from: Screen,
    /// Offending event.
    pub event: GameEvent,
}

/// Errors from planning a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Another action is already in flight; the single-flight guard refused.
    AlreadyPending {
        /// The event currently being processed.
        in_flight: GameEvent,
    },
    /// The event is not valid from the current screen.
    InvalidTransition(InvalidTransition),
}

/// Errors from applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Nothing was planned.
    NoPending,
    /// The supplied plan id does not match the pending plan.
    IdMismatch {
        /// Id of the plan that is actually pending.
        expected: PlanId,
        /// Id the caller supplied.
        got: PlanId,
    },
    /// The screen moved underneath the plan.
    ScreenMoved {
        /// Screen the plan was created from.
        planned_from: Screen,
        /// Screen the machine is on now.
        actual: Screen,
    },
    /// The version counter moved underneath the plan.
    VersionMoved {
        /// Version the plan expected to install.
        expected: usize,
        /// Version that would be installed now.
        actual: usize,
    },
}

/// Errors from aborting a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// Nothing was planned.
    NoPending,
    /// The supplied plan id does not match the pending plan.
    IdMismatch {
        /// Id of the plan that is actually pending.
        expected: PlanId,
        /// Id the caller supplied.
        got: PlanId,
    },
}

/// Identifier of a planned transition.
pub type PlanId = Uuid;

/// A validated transition that has not been applied yet. While a plan is
/// pending no other event can be planned, which is the single-flight guard:
/// `pending == None` means idle, and a pending plan names the exact action
/// in flight.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Identifier used to apply or abort this plan.
    pub id: PlanId,
    /// Screen the machine was on when the plan was made.
    pub from: Screen,
    /// Screen the machine will land on.
    pub to: Screen,
    /// The event that produced the plan.
    pub event: GameEvent,
    /// Version installed when the plan is applied.
    pub version_next: usize,
    /// When the plan was created.
    pub pending_since: Instant,
}

/// Point-in-time view of the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSnapshot {
    /// Current screen.
    pub screen: Screen,
    /// Transition counter.
    pub version: usize,
    /// Event in flight, if any.
    pub in_flight: Option<GameEvent>,
}

/// Screen state machine with a two-phase transition protocol: `plan`
/// validates and reserves, `apply` commits, `abort` rolls back. Oracle work
/// runs between plan and apply so a failure never leaves the machine on a
/// screen it should not be on.
#[derive(Debug, Clone)]
pub struct ScreenStateMachine {
    screen: Screen,
    version: usize,
    pending: Option<Plan>,
}

impl Default for ScreenStateMachine {
    fn default() -> Self {
        Self {
            screen: Screen::Menu,
            version: 0,
            pending: None,
        }
    }
}

impl ScreenStateMachine {
    /// Fresh machine on the menu screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine resumed on a given screen, used when a session snapshot is
    /// restored at startup.
    pub fn resumed_at(screen: Screen) -> Self {
        Self {
            screen,
            version: 0,
            pending: None,
        }
    }

    /// Current screen.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Event currently in flight, if a plan is pending.
    pub fn in_flight(&self) -> Option<GameEvent> {
        self.pending.as_ref().map(|plan| plan.event)
    }

    /// Snapshot of screen, version and in-flight event.
    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot {
            screen: self.screen,
            version: self.version,
            in_flight: self.in_flight(),
        }
    }

    /// Validate an event against the current screen and reserve it. Fails
    /// when another plan is pending (single-flight) or the transition is
    /// invalid.
    pub fn plan(&mut self, event: GameEvent) -> Result<Plan, PlanError> {
        if let Some(pending) = &self.pending {
            return Err(PlanError::AlreadyPending {
                in_flight: pending.event,
            });
        }

        let to = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.screen,
            to,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };
        self.pending = Some(plan.clone());
        Ok(plan)
    }

    /// Commit the pending plan, moving to its target screen.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<Screen, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }
        if self.screen != plan.from {
            return Err(ApplyError::ScreenMoved {
                planned_from: plan.from,
                actual: self.screen,
            });
        }
        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMoved {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.screen = plan.to;
        self.version = plan.version_next;
        Ok(self.screen)
    }

    /// Drop the pending plan without moving, e.g. after an oracle failure.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;
        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }
        self.pending = None;
        Ok(())
    }

    /// The transition table. Re-entrant navigation to the current screen is
    /// allowed and lands where the machine already is.
    fn compute_transition(&self, event: GameEvent) -> Result<Screen, InvalidTransition> {
        let next = match (self.screen, event) {
            // Re-entrant navigation is idempotent, never an error.
            (from, GameEvent::Navigate(target)) if target.screen() == from => from,
            (Screen::Menu, GameEvent::Navigate(NavTarget::Rules)) => Screen::Rules,
            (Screen::Menu, GameEvent::Navigate(NavTarget::History)) => Screen::History,
            (Screen::Rules, GameEvent::Navigate(NavTarget::Menu)) => Screen::Menu,
            (Screen::History, GameEvent::Navigate(NavTarget::Menu)) => Screen::Menu,
            (Screen::Finished, GameEvent::Navigate(NavTarget::Menu)) => Screen::Menu,

            (Screen::Menu, GameEvent::CaseRequested) => Screen::Loading,
            (Screen::Finished, GameEvent::CaseRequested) => Screen::Loading,
            (Screen::Loading, GameEvent::CaseReady) => Screen::Playing,
            (Screen::Loading, GameEvent::CaseFailed) => Screen::Menu,

            (Screen::Playing, GameEvent::Interact) => Screen::Playing,
            (Screen::Playing, GameEvent::Solved) => Screen::Finished,
            (Screen::Playing, GameEvent::Surrendered) => Screen::Finished,

            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(machine: &mut ScreenStateMachine, event: GameEvent) -> Screen {
        let plan = machine.plan(event).unwrap();
        machine.apply(plan.id).unwrap()
    }

    #[test]
    fn starts_on_menu() {
        assert_eq!(ScreenStateMachine::new().screen(), Screen::Menu);
    }

    #[test]
    fn full_case_lifecycle() {
        let mut machine = ScreenStateMachine::new();

        assert_eq!(drive(&mut machine, GameEvent::CaseRequested), Screen::Loading);
        assert_eq!(drive(&mut machine, GameEvent::CaseReady), Screen::Playing);
        assert_eq!(drive(&mut machine, GameEvent::Interact), Screen::Playing);
        assert_eq!(drive(&mut machine, GameEvent::Solved), Screen::Finished);
        assert_eq!(
            drive(&mut machine, GameEvent::CaseRequested),
            Screen::Loading,
            "a new case can start straight from the finished screen"
        );
    }

    #[test]
    fn generation_failure_returns_to_menu() {
        let mut machine = ScreenStateMachine::new();
        drive(&mut machine, GameEvent::CaseRequested);
        assert_eq!(drive(&mut machine, GameEvent::CaseFailed), Screen::Menu);
    }

    #[test]
    fn surrender_finishes_immediately() {
        let mut machine = ScreenStateMachine::new();
        drive(&mut machine, GameEvent::CaseRequested);
        drive(&mut machine, GameEvent::CaseReady);
        assert_eq!(drive(&mut machine, GameEvent::Surrendered), Screen::Finished);
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::Menu)),
            Screen::Menu
        );
    }

    #[test]
    fn side_navigation_round_trips() {
        let mut machine = ScreenStateMachine::new();
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::Rules)),
            Screen::Rules
        );
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::Menu)),
            Screen::Menu
        );
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::History)),
            Screen::History
        );
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::Menu)),
            Screen::Menu
        );
    }

    #[test]
    fn reentrant_navigation_is_a_noop() {
        let mut machine = ScreenStateMachine::new();
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::Menu)),
            Screen::Menu
        );
        drive(&mut machine, GameEvent::Navigate(NavTarget::Rules));
        assert_eq!(
            drive(&mut machine, GameEvent::Navigate(NavTarget::Rules)),
            Screen::Rules
        );
    }

    #[test]
    fn rules_to_history_is_not_a_legal_hop() {
        let mut machine = ScreenStateMachine::new();
        drive(&mut machine, GameEvent::Navigate(NavTarget::Rules));
        let err = machine
            .plan(GameEvent::Navigate(NavTarget::History))
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn pending_plan_is_the_single_flight_guard() {
        let mut machine = ScreenStateMachine::new();
        drive(&mut machine, GameEvent::CaseRequested);
        drive(&mut machine, GameEvent::CaseReady);

        let plan = machine.plan(GameEvent::Interact).unwrap();
        assert_eq!(machine.in_flight(), Some(GameEvent::Interact));

        match machine.plan(GameEvent::Surrendered).unwrap_err() {
            PlanError::AlreadyPending { in_flight } => {
                assert_eq!(in_flight, GameEvent::Interact)
            }
            other => panic!("unexpected error: {other:?}"),
        }

        machine.apply(plan.id).unwrap();
        assert_eq!(machine.in_flight(), None);
    }

    #[test]
    fn abort_rolls_back_without_moving() {
        let mut machine = ScreenStateMachine::new();
        let plan = machine.plan(GameEvent::CaseRequested).unwrap();
        machine.abort(plan.id).unwrap();
        assert_eq!(machine.screen(), Screen::Menu);
        assert_eq!(machine.in_flight(), None);
    }

    #[test]
    fn apply_rejects_mismatched_plan_id() {
        let mut machine = ScreenStateMachine::new();
        let plan = machine.plan(GameEvent::CaseRequested).unwrap();
        let err = machine.apply(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ApplyError::IdMismatch { .. }));
        // The original plan is still applicable.
        assert_eq!(machine.apply(plan.id).unwrap(), Screen::Loading);
    }

    #[test]
    fn interacting_from_menu_is_invalid() {
        let mut machine = ScreenStateMachine::new();
        let err = machine.plan(GameEvent::Interact).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, Screen::Menu);
                assert_eq!(invalid.event, GameEvent::Interact);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
