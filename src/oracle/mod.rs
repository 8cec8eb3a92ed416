//! The resilience layer around the remote judge: a trait describing the
//! three intents the game needs, an HTTP implementation with per-difficulty
//! model fallback, and the repair pass that copes with free-text output.

pub mod error;
mod http;
pub mod prompts;
mod repair;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::warn;

pub use self::error::{OracleError, OracleResult};
pub use self::http::HttpOracle;
pub use self::prompts::REJECTION_FEEDBACK;

use crate::state::case::{AnswerStatus, Difficulty, Puzzle};

/// Total attempts per request, across the fallback roster.
pub const MAX_ATTEMPTS: usize = 3;

/// A puzzle as the oracle returns it; the caller attaches the difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PuzzleDraft {
    /// Short display title.
    pub title: String,
    /// Scenario shown to the player.
    pub surface: String,
    /// Hidden truth.
    pub bottom: String,
}

/// Judgement of a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionVerdict {
    /// The question holds for the hidden truth.
    Yes,
    /// The question contradicts the hidden truth.
    No,
    /// The hidden truth does not determine the answer.
    Irrelevant,
}

impl QuestionVerdict {
    /// Display label shown in the transcript.
    pub fn label(self) -> &'static str {
        match self {
            QuestionVerdict::Yes => "Yes",
            QuestionVerdict::No => "No",
            QuestionVerdict::Irrelevant => "Irrelevant",
        }
    }
}

impl From<QuestionVerdict> for AnswerStatus {
    fn from(verdict: QuestionVerdict) -> Self {
        match verdict {
            QuestionVerdict::Yes => AnswerStatus::Yes,
            QuestionVerdict::No => AnswerStatus::No,
            QuestionVerdict::Irrelevant => AnswerStatus::Irrelevant,
        }
    }
}

/// Judgement of a full-solution guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessVerdict {
    /// Whether the guess captured the core twist.
    pub is_correct: bool,
    /// Feedback shown to the player; on an incorrect guess this is always
    /// [`REJECTION_FEEDBACK`].
    pub feedback: String,
}

/// The three intents the game issues against the remote judge. Object-safe
/// so the state machine can hold it behind an `Arc<dyn Oracle>` and tests
/// can script it.
pub trait Oracle: Send + Sync {
    /// Generate a fresh puzzle, biased away from the given prior scenarios.
    fn generate_puzzle(
        &self,
        difficulty: Difficulty,
        exclusions: Vec<String>,
    ) -> BoxFuture<'static, OracleResult<PuzzleDraft>>;

    /// Generate hint number `hint_index`, given the hints already delivered.
    fn generate_hint(
        &self,
        puzzle: Puzzle,
        delivered: Vec<String>,
        hint_index: u8,
    ) -> BoxFuture<'static, OracleResult<String>>;

    /// Judge a yes/no question against the hidden truth.
    fn evaluate_question(
        &self,
        puzzle: Puzzle,
        question: String,
    ) -> BoxFuture<'static, OracleResult<QuestionVerdict>>;

    /// Judge a full-solution guess against the hidden truth.
    fn evaluate_guess(
        &self,
        puzzle: Puzzle,
        guess: String,
    ) -> BoxFuture<'static, OracleResult<GuessVerdict>>;
}

/// Ordered model candidates per difficulty. The first entry is the
/// preferred model; later entries are fallbacks for retryable failures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelRoster {
    /// Candidates for easy cases.
    pub easy: Vec<String>,
    /// Candidates for medium cases.
    pub medium: Vec<String>,
    /// Candidates for hard cases.
    pub hard: Vec<String>,
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            easy: vec![
                "gpt-4o-mini".into(),
                "gpt-4o".into(),
                "gpt-3.5-turbo".into(),
            ],
            medium: vec![
                "gpt-4o".into(),
                "gpt-4o-mini".into(),
                "gpt-3.5-turbo".into(),
            ],
            hard: vec!["gpt-4.1".into(), "gpt-4o".into(), "gpt-4o-mini".into()],
        }
    }
}

impl ModelRoster {
    /// Ordered candidates for a difficulty. A list left empty in the
    /// configuration falls back to the built-in roster.
    pub fn candidates(&self, difficulty: Difficulty) -> Vec<String> {
        let chosen = match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        };
        if chosen.is_empty() {
            Self::default().candidates(difficulty)
        } else {
            chosen.clone()
        }
    }
}

/// Run up to [`MAX_ATTEMPTS`] attempts, advancing through the candidate
/// models on retryable failures. Auth and quota failures propagate
/// immediately; the roster repeats its last entry when attempts outnumber
/// candidates.
pub(crate) async fn with_fallback<T, F, Fut>(
    candidates: &[String],
    mut attempt: F,
) -> OracleResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = OracleResult<T>>,
{
    for index in 0..MAX_ATTEMPTS {
        let Some(model) = candidates.get(index).or_else(|| candidates.last()) else {
            return Err(OracleError::malformed("no models configured"));
        };

        match attempt(model.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && index + 1 < MAX_ATTEMPTS => {
                warn!(
                    model = %model,
                    attempt = index + 1,
                    error = %err,
                    "oracle attempt failed; trying the next candidate"
                );
            }
            Err(err) => return Err(err),
        }
    }

    Err(OracleError::malformed("attempt budget exhausted"))
}
