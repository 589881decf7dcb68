use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::radar::RadarService;

pub mod handlers;
pub mod models;

pub fn create_router(radar: Arc<RadarService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/radar/search", post(handlers::search_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(radar)
        .layer(cors)
}
