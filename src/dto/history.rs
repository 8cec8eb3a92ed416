use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{format_system_time, game::DifficultyDto};
use crate::state::case::{CaseOutcome, HistoryEntry};

/// Archived case as exposed on the wire. The hidden truth is included;
/// finished cases have nothing left to hide.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntryDto {
    /// Stable identifier of the archive entry.
    pub id: Uuid,
    /// RFC 3339 timestamp of when the case finished.
    pub finished_at: String,
    /// Display title.
    pub title: String,
    /// Scenario text.
    pub surface: String,
    /// Hidden truth.
    pub bottom: String,
    /// Difficulty tier the case was played at.
    pub difficulty: DifficultyDto,
    /// Questions plus guesses asked during the case.
    pub interactions_count: u32,
    /// Hint attempts spent.
    pub hints_used: u8,
    /// `solved` or `surrendered`.
    pub outcome: String,
}

impl From<&HistoryEntry> for HistoryEntryDto {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id,
            finished_at: format_system_time(entry.timestamp),
            title: entry.puzzle.title.clone(),
            surface: entry.puzzle.surface.clone(),
            bottom: entry.puzzle.bottom.clone(),
            difficulty: entry.puzzle.difficulty.into(),
            interactions_count: entry.interactions_count,
            hints_used: entry.hints_used,
            outcome: match entry.outcome {
                CaseOutcome::Solved => "solved",
                CaseOutcome::Surrendered => "surrendered",
            }
            .to_string(),
        }
    }
}

/// Response payload listing archived cases, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Archived cases, newest first.
    pub entries: Vec<HistoryEntryDto>,
}
