use serde::{Deserialize, Serialize};

use crate::data_models::Lead;
use crate::radar::PointFailure;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub keyword: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub search_id: String,
    pub total_found: usize,
    pub leads: Vec<Lead>,
    pub failed_points: Vec<PointFailure>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
