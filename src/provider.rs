use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::data_models::{GridPoint, RawPlaceResult};
use crate::error::RadarError;

/// Zoom level the first grid point is queried at. Each following point is one
/// level tighter, which spreads the provider's result truncation across cells.
pub const BASE_ZOOM: usize = 15;

/// Largest page the places endpoint returns in one call.
pub const MAX_RESULTS_PER_CALL: u32 = 100;

const USER_AGENT: &str = concat!("radar/", env!("CARGO_PKG_VERSION"));

/// One grid point's worth of provider work.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub point: GridPoint,
    pub keyword: String,
    pub radius_km: f64,
    /// Position of `point` in the planned grid.
    pub point_index: usize,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fails with [`RadarError::Configuration`] when the provider cannot be
    /// called at all (e.g. no credentials).
    fn ensure_configured(&self) -> Result<(), RadarError> {
        Ok(())
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<RawPlaceResult>, RadarError>;
}

#[derive(Debug, Serialize)]
struct PlacesRequest<'a> {
    q: &'a str,
    ll: String,
    num: u32,
    hl: &'a str,
    gl: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    places: Option<Vec<RawPlaceResult>>,
}

/// Client for the Serper `places` endpoint.
pub struct SerperProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    language: String,
    region: String,
}

impl SerperProvider {
    pub fn new(config: &Config) -> Result<Self, RadarError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RadarError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.serper_api_key.clone(),
            base_url: config.serper_base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            region: config.region.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, RadarError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| RadarError::Configuration("Missing SERPER_API_KEY".to_string()))
    }
}

/// Serper's location bias string: `@lat,lng,zoomz`.
pub fn location_bias(point: GridPoint, point_index: usize) -> String {
    format!("@{},{},{}z", point.lat, point.lng, BASE_ZOOM + point_index)
}

#[async_trait]
impl SearchProvider for SerperProvider {
    fn ensure_configured(&self) -> Result<(), RadarError> {
        self.api_key().map(|_| ())
    }

    async fn search(&self, query: &PlaceQuery) -> Result<Vec<RawPlaceResult>, RadarError> {
        let api_key = self.api_key()?;
        let url = format!("{}/places", self.base_url);
        let body = PlacesRequest {
            q: &query.keyword,
            ll: location_bias(query.point, query.point_index),
            num: MAX_RESULTS_PER_CALL,
            hl: &self.language,
            gl: &self.region,
        };

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RadarError::Upstream {
                status: Some(status.as_u16()),
                message: format!("places search failed: {}", detail.trim()),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: PlacesResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RadarError::upstream(format!("malformed places payload: {e}")))?;

        let places = parsed.places.unwrap_or_default();
        tracing::debug!(
            point_index = query.point_index,
            results = places.len(),
            "places search completed"
        );
        Ok(places)
    }
}
