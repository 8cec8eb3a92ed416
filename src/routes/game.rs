use axum::{Json, Router, extract::State, routing::get, routing::post};
use axum_valid::Valid;

use crate::{
    dto::game::{GameView, NavigateRequest, PlayerTextRequest, StartCaseRequest},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes driving the game itself: starting cases, questions, guesses,
/// hints and navigation.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/game", get(get_game))
        .route("/game/start", post(start_case))
        .route("/game/ask", post(ask_question))
        .route("/game/solve", post(propose_solution))
        .route("/game/hint", post(request_hint))
        .route("/game/surrender", post(surrender))
        .route("/game/next", post(next_case))
        .route("/game/retry", post(retry))
        .route("/game/navigate", post(navigate))
}

/// Return the full game view for the current state.
#[utoipa::path(
    get,
    path = "/game",
    tag = "game",
    responses((status = 200, description = "Current game view", body = GameView))
)]
pub async fn get_game(State(state): State<SharedState>) -> Json<GameView> {
    Json(game_service::current_view(&state).await)
}

/// Open a new case at the requested difficulty.
#[utoipa::path(
    post,
    path = "/game/start",
    tag = "game",
    request_body = StartCaseRequest,
    responses(
        (status = 200, description = "Case started", body = GameView),
        (status = 409, description = "A case cannot start from the current screen"),
        (status = 503, description = "Puzzle generation failed")
    )
)]
pub async fn start_case(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartCaseRequest>>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::start_case(&state, payload.difficulty.into()).await?;
    Ok(Json(view))
}

/// Ask a yes/no question about the current case.
#[utoipa::path(
    post,
    path = "/game/ask",
    tag = "game",
    request_body = PlayerTextRequest,
    responses(
        (status = 200, description = "Question answered", body = GameView),
        (status = 409, description = "No case is being played"),
        (status = 503, description = "The judge could not be reached")
    )
)]
pub async fn ask_question(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PlayerTextRequest>>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::ask(&state, payload.text).await?;
    Ok(Json(view))
}

/// Propose a full solution to the current case.
#[utoipa::path(
    post,
    path = "/game/solve",
    tag = "game",
    request_body = PlayerTextRequest,
    responses(
        (status = 200, description = "Guess judged", body = GameView),
        (status = 409, description = "No case is being played"),
        (status = 503, description = "The judge could not be reached")
    )
)]
pub async fn propose_solution(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PlayerTextRequest>>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::solve(&state, payload.text).await?;
    Ok(Json(view))
}

/// Request the next hint for the current case.
#[utoipa::path(
    post,
    path = "/game/hint",
    tag = "game",
    responses(
        (status = 200, description = "Hint delivered", body = GameView),
        (status = 409, description = "No hints left or no case in play"),
        (status = 503, description = "The clue could not be retrieved")
    )
)]
pub async fn request_hint(State(state): State<SharedState>) -> Result<Json<GameView>, AppError> {
    let view = game_service::hint(&state).await?;
    Ok(Json(view))
}

/// Give up on the current case and reveal the hidden truth.
#[utoipa::path(
    post,
    path = "/game/surrender",
    tag = "game",
    responses(
        (status = 200, description = "Case surrendered", body = GameView),
        (status = 409, description = "No case is being played")
    )
)]
pub async fn surrender(State(state): State<SharedState>) -> Result<Json<GameView>, AppError> {
    let view = game_service::surrender(&state).await?;
    Ok(Json(view))
}

/// Start another case at the same difficulty as the previous one.
#[utoipa::path(
    post,
    path = "/game/next",
    tag = "game",
    responses(
        (status = 200, description = "Next case started", body = GameView),
        (status = 409, description = "A case cannot start from the current screen")
    )
)]
pub async fn next_case(State(state): State<SharedState>) -> Result<Json<GameView>, AppError> {
    let view = game_service::next_case(&state).await?;
    Ok(Json(view))
}

/// Re-run the last failed action.
#[utoipa::path(
    post,
    path = "/game/retry",
    tag = "game",
    responses(
        (status = 200, description = "Action retried", body = GameView),
        (status = 404, description = "Nothing to retry")
    )
)]
pub async fn retry(State(state): State<SharedState>) -> Result<Json<GameView>, AppError> {
    let view = game_service::retry_last(&state).await?;
    Ok(Json(view))
}

/// Navigate between the menu, rules and history screens.
#[utoipa::path(
    post,
    path = "/game/navigate",
    tag = "game",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Screen changed", body = GameView),
        (status = 409, description = "Navigation not allowed from the current screen")
    )
)]
pub async fn navigate(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<NavigateRequest>>,
) -> Result<Json<GameView>, AppError> {
    let view = game_service::navigate(&state, payload.target.into()).await?;
    Ok(Json(view))
}
