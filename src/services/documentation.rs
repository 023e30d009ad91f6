use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Connect Four Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameResponse,
            crate::dto::game::GameStateMessage,
            crate::dto::ws::PlayerInboundMessage,
            crate::dto::ws::JoinPayload,
            crate::dto::ws::DropDiscPayload,
            crate::dto::ws::PlayerOutboundMessage,
            crate::dto::ws::AlertCode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game creation and inspection"),
        (name = "players", description = "WebSocket operations for players"),
    )
)]
pub struct ApiDoc;
