use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/events",
    responses((status = 200, description = "Game event stream", content_type = "text/event-stream", body = String))
)]
/// Stream realtime game events to connected frontends.
pub async fn event_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("New SSE connection");

    let handshake = Handshake {
        message: "event stream connected".into(),
        degraded: state.is_degraded(),
    };
    if let Ok(event) = ServerEvent::json(Some("handshake".to_string()), &handshake) {
        state.events().broadcast(event);
    }

    sse_service::to_sse_stream(receiver)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/events", get(event_stream))
}
