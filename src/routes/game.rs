use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::game::{CreateGameResponse, GameStateMessage},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling game creation and inspection.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game))
}

/// Create an empty game and return its identifier.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    responses(
        (status = 200, description = "Game created", body = CreateGameResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
) -> Result<Json<CreateGameResponse>, AppError> {
    let game_id = game_service::create_game(&state).await?;
    Ok(Json(CreateGameResponse { game_id }))
}

/// Current state of a game.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game state", body = GameStateMessage),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameStateMessage>, AppError> {
    let snapshot = game_service::game_snapshot(&state, &id).await?;
    Ok(Json(snapshot))
}
