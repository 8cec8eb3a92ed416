use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    dto::game::{GameView, InteractionDto},
    error::ServiceError,
    sanitize::sanitize,
    services::{progress, sse_events},
    state::{
        RetryAction, SOLVED_DISPLAY_DELAY, SharedState,
        case::{
            CaseOutcome, CaseSession, Difficulty, HistoryEntry, Interaction, InteractionKind,
            Puzzle,
        },
        machine::{GameEvent, NavTarget, Screen},
    },
    store::{
        archive,
        snapshot::{self, SessionSnapshot},
    },
};

/// Assemble the full game view for the current state.
pub async fn current_view(state: &SharedState) -> GameView {
    let screen = state.screen_snapshot().await;
    let session = state.session().read().await;
    let retry = state.peek_retry().await;
    let draft = state.draft_input().read().await.clone();
    GameView::assemble(
        &screen,
        session.as_ref(),
        state.is_degraded(),
        retry.as_ref(),
        draft,
    )
}

/// Navigate between the menu, rules and history screens. Leaving the
/// finished screen for the menu drops the finished case from memory.
pub async fn navigate(state: &SharedState, target: NavTarget) -> Result<GameView, ServiceError> {
    let leaving_finished = state.current_screen().await == Screen::Finished;
    let next = state.transition(GameEvent::Navigate(target)).await?;

    if leaving_finished && next == Screen::Menu {
        state.session().write().await.take();
    }
    broadcast_screen(state).await;
    Ok(current_view(state).await)
}

/// Open a new case: move to the loading screen, generate a puzzle and start
/// playing. On failure the machine falls back to the menu and the start
/// becomes retryable.
pub async fn start_case(
    state: &SharedState,
    difficulty: Difficulty,
) -> Result<GameView, ServiceError> {
    state.transition(GameEvent::CaseRequested).await?;
    info!(difficulty = difficulty.label(), "opening a new case");
    *state.last_difficulty().write().await = Some(difficulty);
    broadcast_screen(state).await;
    progress::spawn_loading_ticker(Arc::clone(state));

    let store = state.store().clone();
    let oracle = state.oracle();
    let outcome = state
        .run_transition(GameEvent::CaseReady, || async move {
            let history = archive::load(&store).await;
            let exclusions = archive::exclusion_snippets(&history);
            let draft = oracle.generate_puzzle(difficulty, exclusions).await?;
            Ok((draft, history))
        })
        .await;

    match outcome {
        Ok(((draft, history), _)) => {
            let session = CaseSession::new(Puzzle {
                title: draft.title,
                surface: draft.surface,
                bottom: draft.bottom,
                difficulty,
            });
            let stored =
                snapshot::save(state.store(), &SessionSnapshot::capture(&session, &history, None))
                    .await;
            record_store_write(state, stored);
            *state.session().write().await = Some(session);
            state.clear_retry().await;
            broadcast_screen(state).await;
            Ok(current_view(state).await)
        }
        Err(err) => {
            if let Err(fallback) = state.transition(GameEvent::CaseFailed).await {
                warn!(error = %fallback, "could not leave the loading screen");
            }
            broadcast_screen(state).await;
            fail_action(state, err, RetryAction::Start(difficulty)).await
        }
    }
}

/// Ask a yes/no question about the current case.
pub async fn ask(state: &SharedState, text: String) -> Result<GameView, ServiceError> {
    let text = clean_input(text)?;
    let puzzle = playing_puzzle(state).await?;

    let oracle = state.oracle();
    let question = text.clone();
    let outcome = state
        .run_transition(GameEvent::Interact, || async move {
            Ok(oracle.evaluate_question(puzzle, question).await?)
        })
        .await;

    match outcome {
        Ok((verdict, _)) => {
            let entry = Interaction::question(text, verdict.into(), verdict.label().to_string());
            record_and_snapshot(state, entry).await;
            state.clear_retry().await;
            Ok(current_view(state).await)
        }
        Err(err) => fail_action(state, err, RetryAction::Ask(text)).await,
    }
}

/// Propose a full solution. A correct guess schedules the move to the
/// finished screen after a short delay so the verdict is seen landing.
pub async fn solve(state: &SharedState, text: String) -> Result<GameView, ServiceError> {
    let text = clean_input(text)?;
    let puzzle = playing_puzzle(state).await?;

    let oracle = state.oracle();
    let guess = text.clone();
    let outcome = state
        .run_transition(GameEvent::Interact, || async move {
            Ok(oracle.evaluate_guess(puzzle, guess).await?)
        })
        .await;

    match outcome {
        Ok((verdict, _)) => {
            let entry = Interaction::guess(text, verdict.is_correct, verdict.feedback);
            record_and_snapshot(state, entry).await;
            state.clear_retry().await;

            if verdict.is_correct {
                if let Some(session) = state.session().write().await.as_mut() {
                    session.solved = true;
                }
                schedule_finish(Arc::clone(state));
            }
            Ok(current_view(state).await)
        }
        Err(err) => fail_action(state, err, RetryAction::Solve(text)).await,
    }
}

/// Request a hint. The budget unit is spent as soon as the attempt starts
/// and stays spent even when the oracle call fails.
pub async fn hint(state: &SharedState) -> Result<GameView, ServiceError> {
    playing_puzzle(state).await?;
    {
        let guard = state.session().read().await;
        if guard
            .as_ref()
            .is_none_or(|session| session.hints_remaining == 0)
        {
            return Err(ServiceError::InvalidState("hint budget exhausted".into()));
        }
    }

    let worker = Arc::clone(state);
    let outcome = state
        .run_transition(GameEvent::Interact, || async move {
            let (puzzle, index, delivered) = {
                let mut guard = worker.session().write().await;
                let session = guard
                    .as_mut()
                    .ok_or_else(|| ServiceError::InvalidState("no case in progress".into()))?;
                let Some(index) = session.spend_hint() else {
                    return Err(ServiceError::InvalidState("hint budget exhausted".into()));
                };
                let delivered: Vec<String> = session
                    .delivered_hints()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (session.puzzle.clone(), index, delivered)
            };

            let text = worker
                .oracle()
                .generate_hint(puzzle, delivered, index)
                .await?;
            Ok(Interaction::hint(text))
        })
        .await;

    match outcome {
        Ok((entry, _)) => {
            record_and_snapshot(state, entry).await;
            state.clear_retry().await;
            Ok(current_view(state).await)
        }
        Err(err) => {
            if matches!(err, ServiceError::Oracle(_) | ServiceError::Timeout) {
                // The attempt may have been cancelled mid-flight, so the
                // placeholder is recorded here, outside the timed future: a
                // spent unit always leaves a failure-marked slot behind.
                let placeholder = {
                    let mut guard = state.session().write().await;
                    guard.as_mut().and_then(|session| {
                        let recorded = session
                            .transcript
                            .iter()
                            .filter(|entry| matches!(entry.kind, InteractionKind::Hint))
                            .count() as u8;
                        (session.hint_index > recorded).then(|| {
                            let entry = Interaction::failed_hint();
                            session.record(entry.clone());
                            entry
                        })
                    })
                };
                if let Some(entry) = placeholder {
                    persist_snapshot(state).await;
                    sse_events::broadcast_interaction(state, InteractionDto::from(&entry));
                }
            }
            fail_action(state, err, RetryAction::Hint).await
        }
    }
}

/// Give up on the current case: reveal the truth and archive the defeat.
/// Refused once a correct guess has landed; the solved finish is already on
/// its way.
pub async fn surrender(state: &SharedState) -> Result<GameView, ServiceError> {
    {
        let guard = state.session().read().await;
        if guard.as_ref().is_some_and(|session| session.solved) {
            return Err(ServiceError::InvalidState(
                "the case is already solved".into(),
            ));
        }
    }
    state.transition(GameEvent::Surrendered).await?;
    finalize_case(state, CaseOutcome::Surrendered).await;
    state.clear_retry().await;
    Ok(current_view(state).await)
}

/// Start another case at the same difficulty as the last one.
pub async fn next_case(state: &SharedState) -> Result<GameView, ServiceError> {
    let difficulty = state
        .last_difficulty()
        .read()
        .await
        .unwrap_or(Difficulty::Medium);
    start_case(state, difficulty).await
}

/// Re-run the last failed action, if one is on offer.
pub async fn retry_last(state: &SharedState) -> Result<GameView, ServiceError> {
    let Some(action) = state.take_retry().await else {
        return Err(ServiceError::NotFound("no failed action to retry".into()));
    };

    match action {
        RetryAction::Start(difficulty) => start_case(state, difficulty).await,
        RetryAction::Ask(text) => ask(state, text).await,
        RetryAction::Solve(text) => solve(state, text).await,
        RetryAction::Hint => hint(state).await,
    }
}

/// Restore an interrupted case from the persisted snapshot at startup. When
/// the archive key was lost but the snapshot carries a history copy, that
/// copy is written back.
pub async fn restore_session(state: &SharedState) {
    let Some(snap) = snapshot::load(state.store()).await else {
        return;
    };

    if !snap.history.is_empty() && archive::load(state.store()).await.is_empty() {
        let saved = archive::save(state.store(), &snap.history).await;
        record_store_write(state, saved);
        info!(
            entries = snap.history.len(),
            "history archive restored from session snapshot"
        );
    }

    *state.last_difficulty().write().await = Some(snap.case.puzzle.difficulty);
    *state.draft_input().write().await = snap.draft_input.clone();
    state.resume(Screen::Playing, Some(snap.case)).await;
    info!("in-progress case restored from snapshot");
}

/// Sanitise free player text; input that sanitises away entirely is
/// rejected rather than sent to the oracle.
fn clean_input(text: String) -> Result<String, ServiceError> {
    let cleaned = sanitize(&text).trim().to_string();
    if cleaned.is_empty() {
        return Err(ServiceError::InvalidInput(
            "text is empty after sanitisation".into(),
        ));
    }
    Ok(cleaned)
}

/// Require an unsolved case on the playing screen and hand back its puzzle.
async fn playing_puzzle(state: &SharedState) -> Result<Puzzle, ServiceError> {
    if state.current_screen().await != Screen::Playing {
        return Err(ServiceError::InvalidState("no case is being played".into()));
    }
    let guard = state.session().read().await;
    let session = guard
        .as_ref()
        .ok_or_else(|| ServiceError::InvalidState("no case in progress".into()))?;
    if session.solved {
        return Err(ServiceError::InvalidState(
            "the case is already solved".into(),
        ));
    }
    Ok(session.puzzle.clone())
}

/// Append a transcript entry, broadcast it and refresh the snapshot.
async fn record_and_snapshot(state: &SharedState, entry: Interaction) {
    {
        let mut guard = state.session().write().await;
        if let Some(session) = guard.as_mut() {
            session.record(entry.clone());
        }
    }
    state.draft_input().write().await.take();
    sse_events::broadcast_interaction(state, InteractionDto::from(&entry));
    persist_snapshot(state).await;
}

/// Write the current playing state to the session snapshot, best-effort.
async fn persist_snapshot(state: &SharedState) {
    let session = state.session().read().await.clone();
    let Some(session) = session else {
        return;
    };
    let history = archive::load(state.store()).await;
    let draft = state.draft_input().read().await.clone();
    let stored = snapshot::save(
        state.store(),
        &SessionSnapshot::capture(&session, &history, draft),
    )
    .await;
    record_store_write(state, stored);
}

/// Archive the finished case, drop the snapshot and announce the screen.
async fn finalize_case(state: &SharedState, outcome: CaseOutcome) {
    let session = state.session().read().await.clone();
    if let Some(session) = &session {
        let entry = HistoryEntry::finished(session, outcome);
        let (_, persisted) = archive::append(state.store(), entry).await;
        record_store_write(state, persisted);
    }
    snapshot::clear(state.store()).await;
    broadcast_screen(state).await;
}

/// Move to the finished screen after the display delay.
fn schedule_finish(state: SharedState) {
    tokio::spawn(async move {
        tokio::time::sleep(SOLVED_DISPLAY_DELAY).await;
        match state.transition(GameEvent::Solved).await {
            Ok(_) => finalize_case(&state, CaseOutcome::Solved).await,
            Err(err) => warn!(error = %err, "could not finish the solved case"),
        }
    });
}

/// Record a failed action for retry and surface the error. Only oracle
/// failures and timeouts are worth retrying; rejections for being busy or
/// on the wrong screen are not. Typed text is kept as a draft so the client
/// can put it back in the input field.
async fn fail_action(
    state: &SharedState,
    err: ServiceError,
    retry: RetryAction,
) -> Result<GameView, ServiceError> {
    if matches!(err, ServiceError::Oracle(_) | ServiceError::Timeout) {
        sse_events::broadcast_action_failed(state, &err.to_string(), &retry);
        if let RetryAction::Ask(text) | RetryAction::Solve(text) = &retry {
            *state.draft_input().write().await = Some(text.clone());
            persist_snapshot(state).await;
        }
        state.set_retry(retry).await;
    }
    Err(err)
}

/// Track persistence health and announce changes on the event stream.
fn record_store_write(state: &SharedState, ok: bool) {
    let was_degraded = state.is_degraded();
    state.note_store_write(ok);
    let degraded = state.is_degraded();
    if was_degraded != degraded {
        sse_events::broadcast_system_status(state, degraded);
    }
}

/// Announce the current screen and version on the event stream.
async fn broadcast_screen(state: &SharedState) {
    let snapshot = state.screen_snapshot().await;
    sse_events::broadcast_screen_changed(state, snapshot.screen, snapshot.version);
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use futures::future::BoxFuture;

    use super::*;
    use crate::oracle::{
        GuessVerdict, Oracle, OracleError, OracleResult, PuzzleDraft, QuestionVerdict,
        REJECTION_FEEDBACK,
    };
    use crate::state::{AppState, DEFAULT_ACTION_TIMEOUT};
    use crate::store::{KvBackend, StoreAdapter, memory::MemoryKvBackend};

    /// Scripted oracle: every call pops the next canned result for its
    /// intent; an exhausted script is a malformed response.
    #[derive(Default)]
    struct StubOracle {
        puzzles: Mutex<VecDeque<OracleResult<PuzzleDraft>>>,
        hints: Mutex<VecDeque<OracleResult<String>>>,
        questions: Mutex<VecDeque<OracleResult<QuestionVerdict>>>,
        guesses: Mutex<VecDeque<OracleResult<GuessVerdict>>>,
        hint_delay: Mutex<Option<Duration>>,
    }

    impl StubOracle {
        fn puzzle(self, result: OracleResult<PuzzleDraft>) -> Self {
            self.puzzles.lock().unwrap().push_back(result);
            self
        }

        fn hint(self, result: OracleResult<String>) -> Self {
            self.hints.lock().unwrap().push_back(result);
            self
        }

        /// Make every hint call sleep before resolving.
        fn slow_hints(self, delay: Duration) -> Self {
            *self.hint_delay.lock().unwrap() = Some(delay);
            self
        }

        fn question(self, result: OracleResult<QuestionVerdict>) -> Self {
            self.questions.lock().unwrap().push_back(result);
            self
        }

        fn guess(self, result: OracleResult<GuessVerdict>) -> Self {
            self.guesses.lock().unwrap().push_back(result);
            self
        }
    }

    fn pop<T>(queue: &Mutex<VecDeque<OracleResult<T>>>) -> OracleResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::malformed("script exhausted")))
    }

    impl Oracle for StubOracle {
        fn generate_puzzle(
            &self,
            _difficulty: Difficulty,
            _exclusions: Vec<String>,
        ) -> BoxFuture<'static, OracleResult<PuzzleDraft>> {
            let result = pop(&self.puzzles);
            Box::pin(async move { result })
        }

        fn generate_hint(
            &self,
            _puzzle: Puzzle,
            _delivered: Vec<String>,
            _hint_index: u8,
        ) -> BoxFuture<'static, OracleResult<String>> {
            let result = pop(&self.hints);
            let delay = *self.hint_delay.lock().unwrap();
            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                result
            })
        }

        fn evaluate_question(
            &self,
            _puzzle: Puzzle,
            _question: String,
        ) -> BoxFuture<'static, OracleResult<QuestionVerdict>> {
            let result = pop(&self.questions);
            Box::pin(async move { result })
        }

        fn evaluate_guess(
            &self,
            _puzzle: Puzzle,
            _guess: String,
        ) -> BoxFuture<'static, OracleResult<GuessVerdict>> {
            let result = pop(&self.guesses);
            Box::pin(async move { result })
        }
    }

    fn draft() -> PuzzleDraft {
        PuzzleDraft {
            title: "The Locked Greenhouse".into(),
            surface: "Every plant inside is dead, the door never opened.".into(),
            bottom: "The gardener tinted the glass; nothing survived the dark.".into(),
        }
    }

    fn harness(oracle: StubOracle) -> SharedState {
        harness_with_backend(oracle, Arc::new(MemoryKvBackend::new(256 * 1024)))
    }

    fn harness_with_backend(oracle: StubOracle, backend: Arc<dyn KvBackend>) -> SharedState {
        AppState::new(StoreAdapter::new(backend), Arc::new(oracle))
    }

    #[tokio::test(start_paused = true)]
    async fn a_case_is_solved_end_to_end() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .question(Ok(QuestionVerdict::Yes))
                .guess(Ok(GuessVerdict {
                    is_correct: true,
                    feedback: "Exactly right.".into(),
                })),
        );

        let view = start_case(&state, Difficulty::Easy).await.unwrap();
        assert!(matches!(
            view.screen,
            crate::dto::game::ScreenDto::Playing
        ));
        assert_eq!(view.hints_remaining, Some(3));

        let view = ask(&state, "Did light matter?".into()).await.unwrap();
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].status.as_deref(), Some("yes"));

        // The verdict lands while still on the playing screen.
        let view = solve(&state, "The glass was tinted.".into()).await.unwrap();
        assert!(matches!(
            view.screen,
            crate::dto::game::ScreenDto::Playing
        ));
        assert_eq!(view.transcript[1].status.as_deref(), Some("correct"));

        // The finished screen follows after the display delay.
        tokio::time::sleep(SOLVED_DISPLAY_DELAY * 2).await;
        assert_eq!(state.current_screen().await, Screen::Finished);

        let history = archive::load(state.store()).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, CaseOutcome::Solved);
        assert_eq!(history[0].interactions_count, 2);

        // The snapshot is gone; a finished case never comes back.
        assert!(snapshot::load(state.store()).await.is_none());

        let view = current_view(&state).await;
        assert_eq!(view.solved, Some(true));
        assert!(view.puzzle.unwrap().bottom.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_generation_falls_back_to_the_menu_with_a_retry() {
        let state = harness(StubOracle::default().puzzle(Err(OracleError::ModelUnavailable {
            model: "gpt-4o-mini".into(),
            reason: "status 503".into(),
        })));

        let err = start_case(&state, Difficulty::Hard).await.unwrap_err();
        assert!(matches!(err, ServiceError::Oracle(_)));
        assert_eq!(state.current_screen().await, Screen::Menu);
        assert_eq!(
            state.peek_retry().await,
            Some(RetryAction::Start(Difficulty::Hard))
        );
        assert!(state.session().read().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_question_keeps_the_transcript_and_offers_a_retry() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .question(Err(OracleError::malformed("gibberish")))
                .question(Ok(QuestionVerdict::No)),
        );

        start_case(&state, Difficulty::Medium).await.unwrap();
        let err = ask(&state, "Was it sabotage?".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Oracle(_)));

        assert_eq!(state.current_screen().await, Screen::Playing);
        let view = current_view(&state).await;
        assert!(view.transcript.is_empty());
        assert_eq!(view.retry.unwrap().action, "ask");
        // The typed text is kept as a draft for the input field.
        assert_eq!(view.draft_input.as_deref(), Some("Was it sabotage?"));

        // The retry replays the same question, clearing slot and draft.
        let view = retry_last(&state).await.unwrap();
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].content, "Was it sabotage?");
        assert_eq!(view.transcript[0].status.as_deref(), Some("no"));
        assert!(view.draft_input.is_none());
        assert!(state.peek_retry().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn incorrect_guess_gets_the_fixed_rejection_line() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .guess(Ok(GuessVerdict {
                    is_correct: false,
                    feedback: REJECTION_FEEDBACK.into(),
                })),
        );

        start_case(&state, Difficulty::Easy).await.unwrap();
        let view = solve(&state, "A heat wave killed them.".into()).await.unwrap();

        assert!(matches!(
            view.screen,
            crate::dto::game::ScreenDto::Playing
        ));
        assert_eq!(view.transcript[0].response, REJECTION_FEEDBACK);
        assert_eq!(view.transcript[0].status.as_deref(), Some("incorrect"));

        // No finish is scheduled for a rejection.
        tokio::time::sleep(SOLVED_DISPLAY_DELAY * 2).await;
        assert_eq!(state.current_screen().await, Screen::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_hint_spends_its_unit_and_leaves_a_placeholder() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .hint(Err(OracleError::malformed("gibberish")))
                .hint(Ok("Think about sunlight.".into())),
        );

        start_case(&state, Difficulty::Easy).await.unwrap();
        let err = hint(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::Oracle(_)));

        let view = current_view(&state).await;
        assert_eq!(view.hints_remaining, Some(2));
        assert_eq!(view.transcript.len(), 1);
        assert!(view.transcript[0].failed);
        assert_eq!(view.retry.unwrap().action, "hint");

        // A retry spends a fresh unit.
        let view = retry_last(&state).await.unwrap();
        assert_eq!(view.hints_remaining, Some(1));
        assert_eq!(view.transcript[1].response, "Think about sunlight.");

        // Budget runs dry after the third attempt.
        hint(&state).await.unwrap_err();
        let err = hint(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_hint_still_occupies_a_transcript_slot() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .hint(Ok("too late to matter".into()))
                .slow_hints(DEFAULT_ACTION_TIMEOUT * 2),
        );

        start_case(&state, Difficulty::Easy).await.unwrap();
        let err = hint(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout));

        // The unit is spent and the placeholder fills the slot, even though
        // the attempt was cancelled before it could report back.
        let view = current_view(&state).await;
        assert_eq!(view.hints_remaining, Some(2));
        assert_eq!(view.transcript.len(), 1);
        assert!(view.transcript[0].failed);
        assert_eq!(view.retry.unwrap().action, "hint");
        assert_eq!(state.current_screen().await, Screen::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn surrender_reveals_and_archives_the_defeat() {
        let state = harness(StubOracle::default().puzzle(Ok(draft())));

        start_case(&state, Difficulty::Medium).await.unwrap();
        let view = surrender(&state).await.unwrap();

        assert!(matches!(
            view.screen,
            crate::dto::game::ScreenDto::Finished
        ));
        assert!(view.puzzle.unwrap().bottom.is_some());

        let history = archive::load(state.store()).await;
        assert_eq!(history[0].outcome, CaseOutcome::Surrendered);

        // Back on the menu the case is gone for good.
        let view = navigate(&state, NavTarget::Menu).await.unwrap();
        assert!(view.puzzle.is_none());
        assert!(state.session().read().await.is_none());
        assert!(snapshot::load(state.store()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn surrender_is_refused_once_the_case_is_solved() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .guess(Ok(GuessVerdict {
                    is_correct: true,
                    feedback: "Exactly right.".into(),
                })),
        );

        start_case(&state, Difficulty::Easy).await.unwrap();
        solve(&state, "The glass was tinted.".into()).await.unwrap();

        // Giving up during the solved display delay must not turn the win
        // into a defeat.
        let err = surrender(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        tokio::time::sleep(SOLVED_DISPLAY_DELAY * 2).await;
        assert_eq!(state.current_screen().await, Screen::Finished);
        let history = archive::load(state.store()).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, CaseOutcome::Solved);
    }

    #[tokio::test(start_paused = true)]
    async fn input_that_sanitises_away_is_rejected() {
        let state = harness(StubOracle::default().puzzle(Ok(draft())));
        start_case(&state, Difficulty::Easy).await.unwrap();

        // Zero-width characters and a partially typed blocked tag leave
        // nothing once sanitised.
        let err = ask(&state, "\u{200B}\u{FEFF} <scri".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(current_view(&state).await.transcript.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn asking_without_a_case_is_an_invalid_state() {
        let state = harness(StubOracle::default());
        let err = ask(&state, "Anyone there?".into()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn next_case_reuses_the_last_difficulty() {
        let state = harness(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .puzzle(Ok(PuzzleDraft {
                    title: "The Second Case".into(),
                    surface: "Another scene.".into(),
                    bottom: "Another truth.".into(),
                })),
        );

        start_case(&state, Difficulty::Hard).await.unwrap();
        surrender(&state).await.unwrap();

        let view = next_case(&state).await.unwrap();
        assert!(matches!(
            view.screen,
            crate::dto::game::ScreenDto::Playing
        ));
        assert_eq!(view.hints_remaining, Some(Difficulty::Hard.hint_budget()));
        assert_eq!(view.puzzle.unwrap().title, "The Second Case");
    }

    #[tokio::test(start_paused = true)]
    async fn an_interrupted_case_survives_a_restart() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new(256 * 1024));
        let first = harness_with_backend(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .question(Ok(QuestionVerdict::Irrelevant)),
            Arc::clone(&backend),
        );

        start_case(&first, Difficulty::Medium).await.unwrap();
        ask(&first, "Does the gardener matter?".into())
            .await
            .unwrap();

        // A new process over the same storage.
        let second = harness_with_backend(StubOracle::default(), backend);
        restore_session(&second).await;

        assert_eq!(second.current_screen().await, Screen::Playing);
        let view = current_view(&second).await;
        assert_eq!(view.transcript.len(), 1);
        assert_eq!(view.transcript[0].status.as_deref(), Some("irrelevant"));
        assert_eq!(
            *second.last_difficulty().read().await,
            Some(Difficulty::Medium)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_input_is_kept_as_a_draft_across_restarts() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryKvBackend::new(256 * 1024));
        let first = harness_with_backend(
            StubOracle::default()
                .puzzle(Ok(draft()))
                .question(Err(OracleError::malformed("gibberish"))),
            Arc::clone(&backend),
        );

        start_case(&first, Difficulty::Medium).await.unwrap();
        ask(&first, "Was the glass replaced?".into()).await.unwrap_err();
        assert_eq!(
            current_view(&first).await.draft_input.as_deref(),
            Some("Was the glass replaced?")
        );

        // A new process over the same storage offers the draft back.
        let second = harness_with_backend(StubOracle::default(), backend);
        restore_session(&second).await;
        assert_eq!(
            current_view(&second).await.draft_input.as_deref(),
            Some("Was the glass replaced?")
        );
    }
}
