use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the current health of the backend. Degraded means the
/// last persistence write failed; the game itself keeps running.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
