//! API Routes
//!
//! - `/` - Liveness message
//! - `/api/health` - Health check with AI availability
//! - `/upload` - Dataset upload and chart recommendation

pub mod health;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::middleware::cors_layer;
use crate::models::{AppState, ErrorResponse};
use crate::types::AppError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let body_limit = state.config.server.max_upload_bytes;
    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(health::router(state.clone()))
        .merge(upload::router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnsupportedFile(_)
            | AppError::EmptyDataset(_)
            | AppError::Parse(_)
            | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::LLMApi(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}
