use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::history::HistoryResponse, services::history_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    responses((status = 200, description = "Archived cases, newest first", body = HistoryResponse))
)]
/// Return the archive of finished cases.
pub async fn get_history(State(state): State<SharedState>) -> Json<HistoryResponse> {
    Json(history_service::list_history(&state).await)
}

/// Configure the history routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/history", get(get_history))
}
