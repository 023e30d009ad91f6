/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle operations shared by HTTP and WebSocket handlers.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Background storage connection supervisor.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
