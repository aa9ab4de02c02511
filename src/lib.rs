// Chartwise - chart recommendations for tabular uploads

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
