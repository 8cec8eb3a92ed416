use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty tiers a player can pick when opening a new case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Gentle scenarios solvable in a handful of questions.
    Easy,
    /// The default tier.
    Medium,
    /// Convoluted scenarios; more hints are allowed to compensate.
    Hard,
}

impl Difficulty {
    /// Number of hints granted when a case of this difficulty starts.
    pub fn hint_budget(self) -> u8 {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Medium => 5,
            Difficulty::Hard => 7,
        }
    }

    /// Human-readable label used in prompts and logs.
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// A generated riddle: the visible surface and the hidden truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Short display title.
    pub title: String,
    /// Scenario text shown to the player.
    pub surface: String,
    /// Hidden explanation revealed at game end or piecemeal via hints.
    pub bottom: String,
    /// Difficulty the puzzle was generated for.
    pub difficulty: Difficulty,
}

/// What kind of move produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    /// A yes/no/irrelevant probe.
    Question,
    /// An attempt at the full solution.
    Guess,
    /// A requested clue.
    Hint,
}

/// Verdict attached to a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    /// The question holds for the hidden truth.
    Yes,
    /// The question contradicts the hidden truth.
    No,
    /// The question has no bearing on the hidden truth.
    Irrelevant,
    /// The guess captured the core twist.
    Correct,
    /// The guess missed the core twist.
    Incorrect,
    /// The entry carries a clue rather than a verdict.
    Clue,
}

/// Shown in place of a clue when the oracle call failed; the attempt still
/// occupies its transcript slot and its budget unit.
pub const HINT_FAILED_PLACEHOLDER: &str =
    "The clue could not be retrieved. The attempt still used up a hint.";

/// One transcript entry. Append-only within a case; ordering is significant
/// because hints are numbered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Kind of move this entry records.
    pub kind: InteractionKind,
    /// Player-provided text (empty for hints).
    pub content: String,
    /// Oracle response text shown to the player.
    pub response: String,
    /// Verdict, when the entry carries one.
    pub status: Option<AnswerStatus>,
    /// Marks a hint whose oracle call failed.
    #[serde(default)]
    pub failed: bool,
}

impl Interaction {
    /// Record an answered question.
    pub fn question(content: String, status: AnswerStatus, response: String) -> Self {
        Self {
            kind: InteractionKind::Question,
            content,
            response,
            status: Some(status),
            failed: false,
        }
    }

    /// Record a judged guess.
    pub fn guess(content: String, correct: bool, feedback: String) -> Self {
        Self {
            kind: InteractionKind::Guess,
            content,
            response: feedback,
            status: Some(if correct {
                AnswerStatus::Correct
            } else {
                AnswerStatus::Incorrect
            }),
            failed: false,
        }
    }

    /// Record a delivered clue.
    pub fn hint(text: String) -> Self {
        Self {
            kind: InteractionKind::Hint,
            content: String::new(),
            response: text,
            status: Some(AnswerStatus::Clue),
            failed: false,
        }
    }

    /// Record a clue attempt whose oracle call failed.
    pub fn failed_hint() -> Self {
        Self {
            kind: InteractionKind::Hint,
            content: String::new(),
            response: HINT_FAILED_PLACEHOLDER.into(),
            status: None,
            failed: true,
        }
    }
}

/// Live state of the case currently being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSession {
    /// The puzzle under investigation. Immutable once generated.
    pub puzzle: Puzzle,
    /// Ordered record of questions, guesses and hints.
    pub transcript: Vec<Interaction>,
    /// Hints still available. Monotone non-increasing.
    pub hints_remaining: u8,
    /// Hints attempted so far (successful or not).
    pub hint_index: u8,
    /// Set once a guess has been judged correct.
    pub solved: bool,
    /// When the case was opened.
    pub started_at: SystemTime,
}

impl CaseSession {
    /// Open a fresh session for a newly generated puzzle, with the hint
    /// budget for its difficulty.
    pub fn new(puzzle: Puzzle) -> Self {
        let hints_remaining = puzzle.difficulty.hint_budget();
        Self {
            puzzle,
            transcript: Vec::new(),
            hints_remaining,
            hint_index: 0,
            solved: false,
            started_at: SystemTime::now(),
        }
    }

    /// Append a transcript entry.
    pub fn record(&mut self, interaction: Interaction) {
        self.transcript.push(interaction);
    }

    /// Spend one hint unit up front and return the 1-based index of the
    /// attempt. The unit is consumed even if the oracle call fails later.
    pub fn spend_hint(&mut self) -> Option<u8> {
        if self.hints_remaining == 0 {
            return None;
        }
        self.hints_remaining -= 1;
        self.hint_index += 1;
        Some(self.hint_index)
    }

    /// Number of questions and guesses in the transcript; hints never count.
    pub fn interactions_count(&self) -> u32 {
        self.transcript
            .iter()
            .filter(|entry| {
                matches!(
                    entry.kind,
                    InteractionKind::Question | InteractionKind::Guess
                )
            })
            .count() as u32
    }

    /// Responses of successfully delivered hints, in order, for prompt
    /// context when generating the next one.
    pub fn delivered_hints(&self) -> Vec<&str> {
        self.transcript
            .iter()
            .filter(|entry| matches!(entry.kind, InteractionKind::Hint) && !entry.failed)
            .map(|entry| entry.response.as_str())
            .collect()
    }
}

/// How a finished case ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseOutcome {
    /// The player produced a correct guess.
    Solved,
    /// The player gave up and had the truth revealed.
    Surrendered,
}

/// Archived record of a finished case. Created exactly once, at the moment
/// of solve or surrender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Stable identifier for the archive entry.
    pub id: Uuid,
    /// When the case finished.
    pub timestamp: SystemTime,
    /// The full puzzle, truth included, now that the case is over.
    pub puzzle: Puzzle,
    /// Questions plus guesses asked during the case.
    pub interactions_count: u32,
    /// Hint attempts spent, including failed ones.
    pub hints_used: u8,
    /// Whether the case was solved or surrendered.
    pub outcome: CaseOutcome,
}

impl HistoryEntry {
    /// Build the archive record for a session that just finished.
    pub fn finished(session: &CaseSession, outcome: CaseOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
            puzzle: session.puzzle.clone(),
            interactions_count: session.interactions_count(),
            hints_used: session.hint_index,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_puzzle(difficulty: Difficulty) -> Puzzle {
        Puzzle {
            title: "The Lighthouse Dinner".into(),
            surface: "A man eats at a lighthouse restaurant and weeps.".into(),
            bottom: "He recognises the soup he was once served adrift at sea.".into(),
            difficulty,
        }
    }

    #[test]
    fn hint_budget_matches_difficulty() {
        assert_eq!(Difficulty::Easy.hint_budget(), 3);
        assert_eq!(Difficulty::Medium.hint_budget(), 5);
        assert_eq!(Difficulty::Hard.hint_budget(), 7);
    }

    #[test]
    fn spending_hints_is_monotone_and_bounded() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let mut session = CaseSession::new(sample_puzzle(difficulty));
            let budget = difficulty.hint_budget();

            for attempt in 1..=budget {
                assert_eq!(session.spend_hint(), Some(attempt));
                assert_eq!(session.hints_remaining, budget - attempt);
            }

            // Exhausted budget never goes negative, further attempts refused.
            assert_eq!(session.spend_hint(), None);
            assert_eq!(session.hints_remaining, 0);
            assert_eq!(session.hint_index, budget);
        }
    }

    #[test]
    fn failed_hint_attempt_stays_spent() {
        let mut session = CaseSession::new(sample_puzzle(Difficulty::Easy));
        session.spend_hint().unwrap();
        session.record(Interaction::failed_hint());

        assert_eq!(session.hints_remaining, 2);
        assert_eq!(session.hint_index, 1);
        assert!(session.delivered_hints().is_empty());
        assert_eq!(session.transcript[0].response, HINT_FAILED_PLACEHOLDER);
    }

    #[test]
    fn interactions_count_excludes_hints() {
        let mut session = CaseSession::new(sample_puzzle(Difficulty::Medium));
        session.record(Interaction::question(
            "Is it about food?".into(),
            AnswerStatus::Yes,
            "Yes".into(),
        ));
        session.record(Interaction::hint("Think about the sea.".into()));
        session.record(Interaction::guess(
            "He ate his crewmate.".into(),
            false,
            "Not quite.".into(),
        ));

        assert_eq!(session.interactions_count(), 2);
        assert_eq!(session.delivered_hints(), vec!["Think about the sea."]);
    }

    #[test]
    fn history_entry_captures_session_counters() {
        let mut session = CaseSession::new(sample_puzzle(Difficulty::Easy));
        session.record(Interaction::question(
            "Was he alone?".into(),
            AnswerStatus::No,
            "No".into(),
        ));
        session.spend_hint().unwrap();
        session.record(Interaction::hint("He was once a sailor.".into()));

        let entry = HistoryEntry::finished(&session, CaseOutcome::Surrendered);
        assert_eq!(entry.interactions_count, 1);
        assert_eq!(entry.hints_used, 1);
        assert_eq!(entry.outcome, CaseOutcome::Surrendered);
        assert_eq!(entry.puzzle, session.puzzle);
    }
}
