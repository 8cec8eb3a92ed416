use crate::{
    dto::history::HistoryResponse,
    state::SharedState,
    store::archive,
};

/// List the archived cases, newest first.
pub async fn list_history(state: &SharedState) -> HistoryResponse {
    let entries = archive::load(state.store()).await;
    HistoryResponse {
        entries: entries.iter().map(Into::into).collect(),
    }
}
