use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        game::InteractionDto,
        sse::{
            ActionFailedEvent, InteractionEvent, LoadingProgressEvent, ScreenChangedEvent,
            ServerEvent, SystemStatus,
        },
    },
    state::{RetryAction, SharedState, machine::Screen},
};

const EVENT_SCREEN_CHANGED: &str = "screen_changed";
const EVENT_INTERACTION: &str = "interaction";
const EVENT_LOADING_PROGRESS: &str = "loading_progress";
const EVENT_ACTION_FAILED: &str = "action_failed";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast a committed screen change.
pub fn broadcast_screen_changed(state: &SharedState, screen: Screen, version: usize) {
    let payload = ScreenChangedEvent {
        screen: screen.into(),
        version,
    };
    send_event(state, EVENT_SCREEN_CHANGED, &payload);
}

/// Broadcast a transcript entry that just landed.
pub fn broadcast_interaction(state: &SharedState, entry: InteractionDto) {
    let payload = InteractionEvent { entry };
    send_event(state, EVENT_INTERACTION, &payload);
}

/// Broadcast a synthetic loading progress tick.
pub fn broadcast_loading_progress(state: &SharedState, percent: u8) {
    let payload = LoadingProgressEvent { percent };
    send_event(state, EVENT_LOADING_PROGRESS, &payload);
}

/// Broadcast that an action failed and which retry is on offer.
pub fn broadcast_action_failed(state: &SharedState, message: &str, retry: &RetryAction) {
    let payload = ActionFailedEvent {
        message: message.to_string(),
        retryable: crate::dto::game::RetryDto::from(retry).action,
    };
    send_event(state, EVENT_ACTION_FAILED, &payload);
}

/// Broadcast the degraded flag whenever it flips.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
