//! Short-lived snapshot of an in-progress case, so a reload (or a server
//! restart) drops the player back into the game they were playing.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{SESSION_KEY, StoreAdapter};
use crate::state::{
    case::{CaseSession, HistoryEntry},
    machine::Screen,
};

/// Snapshots older than this are considered stale and discarded on load.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(60 * 60);

/// Everything needed to resume an in-progress case. Written on every
/// relevant state change while playing, deleted the moment a case ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Screen the player was on (always `Playing` for a live snapshot).
    pub screen: Screen,
    /// The case in progress: puzzle, transcript and hint counters.
    pub case: CaseSession,
    /// Copy of the archive at snapshot time; the `history` key stays
    /// authoritative, this copy is only a fallback if that key is lost.
    pub history: Vec<HistoryEntry>,
    /// Unsent input the player had typed, preserved across restores.
    pub draft_input: Option<String>,
    /// When the snapshot was written.
    pub saved_at: SystemTime,
}

impl SessionSnapshot {
    /// Snapshot the live playing state right now.
    pub fn capture(
        case: &CaseSession,
        history: &[HistoryEntry],
        draft_input: Option<String>,
    ) -> Self {
        Self {
            screen: Screen::Playing,
            case: case.clone(),
            history: history.to_vec(),
            draft_input,
            saved_at: SystemTime::now(),
        }
    }

    /// Whether the snapshot has outlived [`SNAPSHOT_TTL`]. A clock that went
    /// backwards counts as unexpired.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now.duration_since(self.saved_at)
            .map(|age| age > SNAPSHOT_TTL)
            .unwrap_or(false)
    }
}

/// Persist the snapshot, best-effort. Returns whether the write stuck.
pub async fn save(store: &StoreAdapter, snapshot: &SessionSnapshot) -> bool {
    match serde_json::to_string(snapshot) {
        Ok(payload) => store.set(SESSION_KEY, payload).await,
        Err(err) => {
            warn!(error = %err, "session snapshot failed to serialise");
            false
        }
    }
}

/// Load a restorable snapshot. Expired or structurally invalid payloads are
/// deleted and reported as absent.
pub async fn load(store: &StoreAdapter) -> Option<SessionSnapshot> {
    let raw = store.get(SESSION_KEY).await?;

    let snapshot = match serde_json::from_str::<SessionSnapshot>(&raw) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(error = %err, "session snapshot is structurally invalid; discarding");
            store.remove(SESSION_KEY).await;
            return None;
        }
    };

    if snapshot.is_expired(SystemTime::now()) {
        info!("session snapshot expired; discarding");
        store.remove(SESSION_KEY).await;
        return None;
    }

    Some(snapshot)
}

/// Delete any stored snapshot; a finished or abandoned case must not come
/// back on the next load.
pub async fn clear(store: &StoreAdapter) {
    store.remove(SESSION_KEY).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state::case::{Difficulty, Puzzle};
    use crate::store::memory::MemoryKvBackend;

    fn adapter() -> StoreAdapter {
        StoreAdapter::new(Arc::new(MemoryKvBackend::new(64 * 1024)))
    }

    fn live_case() -> CaseSession {
        CaseSession::new(Puzzle {
            title: "The Silent Orchestra".into(),
            surface: "The concert hall applauds a performance nobody heard.".into(),
            bottom: "The orchestra played for a deaf school; the applause was signed.".into(),
            difficulty: Difficulty::Medium,
        })
    }

    #[tokio::test]
    async fn unexpired_snapshot_round_trips() {
        let store = adapter();
        let mut case = live_case();
        case.spend_hint();

        let snapshot = SessionSnapshot::capture(&case, &[], Some("was it staged?".into()));
        assert!(save(&store, &snapshot).await);

        let restored = load(&store).await.expect("snapshot restorable");
        assert_eq!(restored.screen, Screen::Playing);
        assert_eq!(restored.case, case);
        assert_eq!(restored.history, vec![]);
        assert_eq!(restored.draft_input.as_deref(), Some("was it staged?"));
        assert_eq!(restored.case.hints_remaining, 4);
        assert_eq!(restored.case.hint_index, 1);
    }

    #[tokio::test]
    async fn expired_snapshot_is_discarded_on_load() {
        let store = adapter();
        let mut snapshot = SessionSnapshot::capture(&live_case(), &[], None);
        snapshot.saved_at = SystemTime::now() - (SNAPSHOT_TTL + Duration::from_secs(1));
        assert!(save(&store, &snapshot).await);

        assert!(load(&store).await.is_none());
        // The stale payload was removed, not just skipped.
        assert_eq!(store.get(SESSION_KEY).await, None);
    }

    #[tokio::test]
    async fn invalid_snapshot_is_discarded_on_load() {
        let store = adapter();
        store
            .set(SESSION_KEY, r#"{"screen":"playing","case":42}"#.into())
            .await;

        assert!(load(&store).await.is_none());
        assert_eq!(store.get(SESSION_KEY).await, None);
    }

    #[tokio::test]
    async fn clear_removes_the_snapshot() {
        let store = adapter();
        save(&store, &SessionSnapshot::capture(&live_case(), &[], None)).await;
        clear(&store).await;
        assert!(load(&store).await.is_none());
    }
}
