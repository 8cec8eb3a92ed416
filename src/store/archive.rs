//! The append-only, capped archive of finished cases.

use tracing::warn;

use super::{HISTORY_KEY, StoreAdapter};
use crate::state::case::HistoryEntry;

/// Maximum number of finished cases kept; the oldest entry is evicted when a
/// new one would overflow the cap.
pub const HISTORY_CAP: usize = 50;

/// Characters of each surface kept when building exclusion snippets.
const EXCLUSION_SNIPPET_LEN: usize = 80;

/// Load the archive, newest first. An absent or unparseable payload is an
/// empty archive, never an error.
pub async fn load(store: &StoreAdapter) -> Vec<HistoryEntry> {
    let Some(raw) = store.get(HISTORY_KEY).await else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "history archive is unreadable; starting fresh");
            Vec::new()
        }
    }
}

/// Prepend a finished case, enforce the cap and persist best-effort.
/// Returns the updated archive and whether the write stuck.
pub async fn append(store: &StoreAdapter, entry: HistoryEntry) -> (Vec<HistoryEntry>, bool) {
    let mut entries = load(store).await;
    entries.insert(0, entry);
    entries.truncate(HISTORY_CAP);

    let persisted = match serde_json::to_string(&entries) {
        Ok(payload) => store.set(HISTORY_KEY, payload).await,
        Err(err) => {
            warn!(error = %err, "history archive failed to serialise");
            false
        }
    };
    (entries, persisted)
}

/// Persist an already-assembled archive, used when restoring a snapshot
/// that carries history the store has lost.
pub async fn save(store: &StoreAdapter, entries: &[HistoryEntry]) -> bool {
    match serde_json::to_string(entries) {
        Ok(payload) => store.set(HISTORY_KEY, payload).await,
        Err(err) => {
            warn!(error = %err, "history archive failed to serialise");
            false
        }
    }
}

/// Titles and surface snippets of archived puzzles, handed to the oracle so
/// generation is biased away from repeats. A prompt-level nudge, not a
/// dedup guarantee.
pub fn exclusion_snippets(entries: &[HistoryEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let snippet: String = entry
                .puzzle
                .surface
                .chars()
                .take(EXCLUSION_SNIPPET_LEN)
                .collect();
            format!("{}: {}", entry.puzzle.title, snippet)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state::case::{CaseOutcome, CaseSession, Difficulty, Puzzle};
    use crate::store::memory::MemoryKvBackend;

    fn adapter(quota: usize) -> StoreAdapter {
        StoreAdapter::new(Arc::new(MemoryKvBackend::new(quota)))
    }

    fn entry(index: usize) -> HistoryEntry {
        let session = CaseSession::new(Puzzle {
            title: format!("Case {index}"),
            surface: "surface".into(),
            bottom: "bottom".into(),
            difficulty: Difficulty::Easy,
        });
        HistoryEntry::finished(&session, CaseOutcome::Solved)
    }

    #[tokio::test]
    async fn newest_entry_comes_first() {
        let store = adapter(64 * 1024);
        append(&store, entry(1)).await;
        let (entries, persisted) = append(&store, entry(2)).await;

        assert!(persisted);
        assert_eq!(entries[0].puzzle.title, "Case 2");
        assert_eq!(entries[1].puzzle.title, "Case 1");

        let reloaded = load(&store).await;
        assert_eq!(reloaded, entries);
    }

    #[tokio::test]
    async fn cap_evicts_the_oldest_entry() {
        let store = adapter(10 * 1024 * 1024);
        for index in 0..HISTORY_CAP {
            append(&store, entry(index)).await;
        }
        let (entries, _) = append(&store, entry(HISTORY_CAP)).await;

        assert_eq!(entries.len(), HISTORY_CAP);
        assert_eq!(entries[0].puzzle.title, format!("Case {HISTORY_CAP}"));
        // "Case 0" was the oldest and is gone.
        assert!(entries.iter().all(|e| e.puzzle.title != "Case 0"));
    }

    #[tokio::test]
    async fn quota_pressure_trims_to_ten_and_write_succeeds() {
        // A 51-entry archive that overflows the budget; 10 entries fit.
        let oversized: Vec<HistoryEntry> = (0..=HISTORY_CAP).map(entry).collect();
        let payload = serde_json::to_string(&oversized).unwrap();
        let store = adapter(payload.len() / 2);

        assert!(store.set(HISTORY_KEY, payload).await);

        let persisted = load(&store).await;
        assert_eq!(persisted.len(), crate::store::QUOTA_TRIM_LEN);
        // The newest entries survive the trim.
        assert_eq!(persisted[0].puzzle.title, "Case 0");
    }

    #[tokio::test]
    async fn exclusion_snippets_cover_title_and_surface() {
        let snippets = exclusion_snippets(&[entry(7)]);
        assert_eq!(snippets, vec!["Case 7: surface".to_string()]);
    }
}
