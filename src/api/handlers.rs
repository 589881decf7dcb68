use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::RadarError;
use crate::radar::RadarService;

use super::models::{HealthResponse, SearchRequest, SearchResponse};

pub async fn search_handler(
    State(radar): State<Arc<RadarService>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, RadarError> {
    let start = Instant::now();

    let Json(request) = payload.map_err(|e| {
        RadarError::Validation(format!("Invalid request body: {}", e.body_text()))
    })?;

    let request = radar.validate(
        request.keyword.as_deref(),
        request.lat,
        request.lng,
        request.radius,
    )?;

    let outcome = radar.run(&request).await?;

    tracing::info!(
        search_id = %outcome.search_id,
        total_found = outcome.total_found,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "radar search served"
    );

    Ok(Json(SearchResponse {
        success: true,
        search_id: outcome.search_id,
        total_found: outcome.total_found,
        leads: outcome.leads,
        failed_points: outcome.failures,
    }))
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
