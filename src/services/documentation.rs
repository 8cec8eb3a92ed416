use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Turtle Soup Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::history::get_history,
        crate::routes::game::get_game,
        crate::routes::game::start_case,
        crate::routes::game::ask_question,
        crate::routes::game::propose_solution,
        crate::routes::game::request_hint,
        crate::routes::game::surrender,
        crate::routes::game::next_case,
        crate::routes::game::retry,
        crate::routes::game::navigate,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ScreenChangedEvent,
            crate::dto::sse::InteractionEvent,
            crate::dto::sse::LoadingProgressEvent,
            crate::dto::sse::ActionFailedEvent,
            crate::dto::game::GameView,
            crate::dto::game::PuzzleCard,
            crate::dto::game::InteractionDto,
            crate::dto::game::RetryDto,
            crate::dto::game::ScreenDto,
            crate::dto::game::DifficultyDto,
            crate::dto::game::NavTargetDto,
            crate::dto::game::StartCaseRequest,
            crate::dto::game::PlayerTextRequest,
            crate::dto::game::NavigateRequest,
            crate::dto::history::HistoryResponse,
            crate::dto::history::HistoryEntryDto,
        )
    ),
    tags(
        (name = "game", description = "Gameplay operations"),
        (name = "history", description = "Archive of finished cases"),
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
pub struct ApiDoc;
