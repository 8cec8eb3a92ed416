/// OpenAPI documentation generation.
pub mod documentation;
/// Core game logic and state transitions.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Read access to the finished-case archive.
pub mod history_service;
/// Synthetic loading progress ticker.
pub mod progress;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
