use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::{InteractionDto, ScreenDto};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    /// SSE event name, when the payload is typed.
    pub event: Option<String>,
    /// Serialised JSON body.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether persistence writes are currently failing.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether persistence writes are currently failing.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the screen changes.
pub struct ScreenChangedEvent {
    /// Screen the UI should now render.
    pub screen: ScreenDto,
    /// Transition counter after the change.
    pub version: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a transcript entry lands (question answered, guess
/// judged, hint delivered).
pub struct InteractionEvent {
    /// The transcript entry as it appears in the game view.
    pub entry: InteractionDto,
}

#[derive(Debug, Serialize, ToSchema)]
/// Synthetic progress ticks emitted while a puzzle is being generated.
pub struct LoadingProgressEvent {
    /// Monotone percentage, capped below 100 until generation finishes.
    pub percent: u8,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an action failed and a retry is available.
pub struct ActionFailedEvent {
    /// Human-readable failure description.
    pub message: String,
    /// Which action can be retried (`start`, `ask`, `solve`, `hint`).
    pub retryable: String,
}
