use axum::{extract::State, response::Json as ResponseJson, routing::get, Json, Router};

use crate::models::{AppState, HealthResponse, StatusResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn root() -> ResponseJson<StatusResponse> {
    Json(StatusResponse {
        status: "healthy".to_string(),
        message: "Data Visualization API is running".to_string(),
    })
}

async fn health_check(State(state): State<AppState>) -> ResponseJson<HealthResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        ai_enabled: state.recommender.ai_enabled(),
    };

    Json(response)
}
