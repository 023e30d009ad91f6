use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether a storage backend is serving requests, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.sessions().backend().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
