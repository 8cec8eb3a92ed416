use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/health` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
}

impl HealthResponse {
    /// Health response for a fully operational backend.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// Health response for a backend whose persistence writes are failing.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}
