use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::validate_not_blank;
use crate::state::{
    RetryAction,
    case::{AnswerStatus, CaseSession, Difficulty, Interaction, InteractionKind},
    machine::{NavTarget, Screen, ScreenSnapshot},
};

/// Difficulty tier as exposed on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyDto {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyDto> for Difficulty {
    fn from(dto: DifficultyDto) -> Self {
        match dto {
            DifficultyDto::Easy => Difficulty::Easy,
            DifficultyDto::Medium => Difficulty::Medium,
            DifficultyDto::Hard => Difficulty::Hard,
        }
    }
}

impl From<Difficulty> for DifficultyDto {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => DifficultyDto::Easy,
            Difficulty::Medium => DifficultyDto::Medium,
            Difficulty::Hard => DifficultyDto::Hard,
        }
    }
}

/// Screen the UI should render.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScreenDto {
    Menu,
    Rules,
    History,
    Loading,
    Playing,
    Finished,
}

impl From<Screen> for ScreenDto {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::Menu => ScreenDto::Menu,
            Screen::Rules => ScreenDto::Rules,
            Screen::History => ScreenDto::History,
            Screen::Loading => ScreenDto::Loading,
            Screen::Playing => ScreenDto::Playing,
            Screen::Finished => ScreenDto::Finished,
        }
    }
}

/// Destinations reachable through plain navigation.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NavTargetDto {
    Menu,
    Rules,
    History,
}

impl From<NavTargetDto> for NavTarget {
    fn from(dto: NavTargetDto) -> Self {
        match dto {
            NavTargetDto::Menu => NavTarget::Menu,
            NavTargetDto::Rules => NavTarget::Rules,
            NavTargetDto::History => NavTarget::History,
        }
    }
}

/// Request body for opening a new case.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartCaseRequest {
    /// Difficulty tier for the new case.
    pub difficulty: DifficultyDto,
}

/// Request body carrying free player text (a question or a guess).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlayerTextRequest {
    /// The question or guess. Sanitised server-side before use.
    #[validate(
        custom(function = validate_not_blank),
        length(max = 500, message = "Text must be at most 500 characters")
    )]
    pub text: String,
}

/// Request body for side navigation.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NavigateRequest {
    /// Where to go.
    pub target: NavTargetDto,
}

/// Transcript entry as shown to the player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InteractionDto {
    /// `question`, `guess` or `hint`.
    pub kind: String,
    /// Player-provided text (empty for hints).
    pub content: String,
    /// Response text shown under the entry.
    pub response: String,
    /// Verdict label, when the entry carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Marks a hint whose retrieval failed.
    pub failed: bool,
}

impl From<&Interaction> for InteractionDto {
    fn from(entry: &Interaction) -> Self {
        let kind = match entry.kind {
            InteractionKind::Question => "question",
            InteractionKind::Guess => "guess",
            InteractionKind::Hint => "hint",
        };
        let status = entry.status.map(|status| {
            match status {
                AnswerStatus::Yes => "yes",
                AnswerStatus::No => "no",
                AnswerStatus::Irrelevant => "irrelevant",
                AnswerStatus::Correct => "correct",
                AnswerStatus::Incorrect => "incorrect",
                AnswerStatus::Clue => "clue",
            }
            .to_string()
        });
        Self {
            kind: kind.to_string(),
            content: entry.content.clone(),
            response: entry.response.clone(),
            status,
            failed: entry.failed,
        }
    }
}

/// The puzzle as shown to the player. The hidden truth is included only
/// once the case is over.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PuzzleCard {
    /// Display title.
    pub title: String,
    /// Scenario text.
    pub surface: String,
    /// Difficulty tier.
    pub difficulty: DifficultyDto,
    /// Hidden truth; present only on the finished screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<String>,
}

/// The failed action the player can retry, if any.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RetryDto {
    /// `start`, `ask`, `solve` or `hint`.
    pub action: String,
}

impl From<&RetryAction> for RetryDto {
    fn from(action: &RetryAction) -> Self {
        let action = match action {
            RetryAction::Start(_) => "start",
            RetryAction::Ask(_) => "ask",
            RetryAction::Solve(_) => "solve",
            RetryAction::Hint => "hint",
        };
        Self {
            action: action.to_string(),
        }
    }
}

/// Full game view: everything a reloading client needs to render.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameView {
    /// Screen to render.
    pub screen: ScreenDto,
    /// Transition counter; increases on every committed transition.
    pub version: usize,
    /// Whether an action is currently in flight.
    pub busy: bool,
    /// Whether persistence writes are currently failing.
    pub degraded: bool,
    /// The puzzle, when a case is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puzzle: Option<PuzzleCard>,
    /// Transcript of the current case.
    pub transcript: Vec<InteractionDto>,
    /// Hints still available in the current case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints_remaining: Option<u8>,
    /// Whether the finished case was solved (as opposed to surrendered).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solved: Option<bool>,
    /// Failed action available for retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryDto>,
    /// Text of the last failed action, kept so the client can restore it
    /// into the input field. Survives snapshot and restore.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_input: Option<String>,
}

impl GameView {
    /// Assemble the view from the screen snapshot and the live case.
    pub fn assemble(
        snapshot: &ScreenSnapshot,
        session: Option<&CaseSession>,
        degraded: bool,
        retry: Option<&RetryAction>,
        draft_input: Option<String>,
    ) -> Self {
        let reveal = snapshot.screen == Screen::Finished;
        let puzzle = session.map(|session| PuzzleCard {
            title: session.puzzle.title.clone(),
            surface: session.puzzle.surface.clone(),
            difficulty: session.puzzle.difficulty.into(),
            bottom: reveal.then(|| session.puzzle.bottom.clone()),
        });

        Self {
            screen: snapshot.screen.into(),
            version: snapshot.version,
            busy: snapshot.in_flight.is_some(),
            degraded,
            puzzle,
            transcript: session
                .map(|session| session.transcript.iter().map(Into::into).collect())
                .unwrap_or_default(),
            hints_remaining: session.map(|session| session.hints_remaining),
            solved: session.filter(|_| reveal).map(|session| session.solved),
            retry: retry.map(Into::into),
            draft_input,
        }
    }
}
