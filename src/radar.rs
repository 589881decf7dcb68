//! Radar sweep orchestration.
//!
//! One [`RadarService::run`] call plans the grid, queries every point with at
//! most `max_concurrent_calls` provider requests in flight, writes each
//! point's raw results through to the cache, waits for all points to settle
//! and then aggregates whatever came back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::aggregator::aggregate_and_classify;
use crate::cache::CacheStore;
use crate::classifier::LeadClassifier;
use crate::config::Config;
use crate::data_models::{
    CacheRecord, GeoPoint, GridPoint, Lead, RawPlaceResult, SearchRequest, cell_key,
};
use crate::error::RadarError;
use crate::grid::GridPlanner;
use crate::provider::{PlaceQuery, SearchProvider};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Provider,
    Cache,
}

/// A grid point that did not complete cleanly.
#[derive(Serialize, Debug, Clone)]
pub struct PointFailure {
    pub point_index: usize,
    pub point: GridPoint,
    pub stage: FailureStage,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct RadarOutcome {
    pub search_id: String,
    pub total_found: usize,
    pub leads: Vec<Lead>,
    pub failures: Vec<PointFailure>,
    pub grid_size: usize,
    pub cache_hits: usize,
}

/// What one grid point contributed.
struct PointOutcome {
    results: Vec<RawPlaceResult>,
    failures: Vec<PointFailure>,
    cache_hit: bool,
}

pub struct RadarService {
    config: Config,
    planner: GridPlanner,
    classifier: LeadClassifier,
    provider: Arc<dyn SearchProvider>,
    cache: Arc<dyn CacheStore>,
    concurrent_calls: Arc<Semaphore>,
}

impl RadarService {
    pub fn new(
        config: Config,
        provider: Arc<dyn SearchProvider>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            planner: GridPlanner::new(config.correct_longitude),
            classifier: LeadClassifier,
            concurrent_calls: Arc::new(Semaphore::new(config.max_concurrent_calls.max(1))),
            config,
            provider,
            cache,
        }
    }

    /// Checks the raw request fields and fills in the default radius.
    pub fn validate(
        &self,
        keyword: Option<&str>,
        lat: Option<f64>,
        lng: Option<f64>,
        radius_km: Option<f64>,
    ) -> Result<SearchRequest, RadarError> {
        let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
        let (Some(keyword), Some(lat), Some(lng)) = (keyword, lat, lng) else {
            return Err(RadarError::Validation(
                "Missing parameters: keyword, lat, lng".to_string(),
            ));
        };
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(RadarError::Validation(format!("Invalid latitude: {lat}")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(RadarError::Validation(format!("Invalid longitude: {lng}")));
        }

        let radius_km = radius_km
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(self.config.default_radius_km);

        Ok(SearchRequest {
            keyword: keyword.to_string(),
            center: GeoPoint::new(lat, lng),
            radius_km,
        })
    }

    pub async fn run(&self, request: &SearchRequest) -> Result<RadarOutcome, RadarError> {
        // Requests built by hand skip `validate`, so hold them to the same rules.
        let request = self.validate(
            Some(&request.keyword),
            Some(request.center.lat),
            Some(request.center.lng),
            Some(request.radius_km),
        )?;
        self.provider.ensure_configured()?;

        let search_id = nanoid::nanoid!();
        let grid = self.planner.plan(request.center, request.radius_km);
        let span = tracing::info_span!(
            "radar_search",
            search_id = %search_id,
            keyword = %request.keyword,
            points = grid.len(),
        );

        let outcome = async {
            tracing::info!(radius_km = request.radius_km, "searching grid");

            let tasks = grid
                .iter()
                .enumerate()
                .map(|(index, point)| self.search_point(&search_id, &request, index, *point));
            // join_all keeps grid order, which makes first-seen dedup deterministic.
            let outcomes = join_all(tasks).await;

            let mut raw = Vec::new();
            let mut failures = Vec::new();
            let mut cache_hits = 0;
            for outcome in outcomes {
                raw.extend(outcome.results);
                failures.extend(outcome.failures);
                cache_hits += usize::from(outcome.cache_hit);
            }

            let raw_count = raw.len();
            let leads = aggregate_and_classify(
                raw,
                request.center,
                request.radius_km,
                &self.classifier,
            );

            tracing::info!(
                raw = raw_count,
                leads = leads.len(),
                failed_points = failures.len(),
                cache_hits,
                "radar search finished"
            );

            RadarOutcome {
                total_found: leads.len(),
                leads,
                failures,
                grid_size: grid.len(),
                cache_hits,
                search_id: search_id.clone(),
            }
        }
        .instrument(span)
        .await;

        Ok(outcome)
    }

    fn fresh_since(&self) -> DateTime<Utc> {
        self.config
            .cache_ttl()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Never fails: provider and cache errors are reported in the outcome.
    async fn search_point(
        &self,
        search_id: &str,
        request: &SearchRequest,
        point_index: usize,
        point: GridPoint,
    ) -> PointOutcome {
        let mut failures = Vec::new();
        let fail = |stage: FailureStage, error: &RadarError| {
            tracing::warn!(point_index, ?stage, error = %error, "grid point failed");
            PointFailure {
                point_index,
                point,
                stage,
                error: error.to_string(),
            }
        };

        if self.config.read_through_enabled() {
            let key = cell_key(point, &request.keyword, request.radius_km);
            match self.cache.lookup(&key, self.fresh_since()).await {
                Ok(Some(results)) => {
                    tracing::debug!(point_index, results = results.len(), "cache hit");
                    return PointOutcome {
                        results,
                        failures,
                        cache_hit: true,
                    };
                }
                Ok(None) => {}
                Err(e) => failures.push(fail(FailureStage::Cache, &e)),
            }
        }

        let query = PlaceQuery {
            point,
            keyword: request.keyword.clone(),
            radius_km: request.radius_km,
            point_index,
        };

        let searched = match self.concurrent_calls.acquire().await {
            Ok(_permit) => self.provider.search(&query).await,
            Err(_) => Err(RadarError::upstream("provider call pool closed")),
        };

        let results = match searched {
            Ok(results) => results,
            Err(e) => {
                failures.push(fail(FailureStage::Provider, &e));
                return PointOutcome {
                    results: Vec::new(),
                    failures,
                    cache_hit: false,
                };
            }
        };

        let record = CacheRecord::new(
            search_id.to_string(),
            point,
            request.keyword.clone(),
            request.radius_km,
            results,
        );
        if let Err(e) = self.cache.record(&record).await {
            failures.push(fail(FailureStage::Cache, &e));
        }

        PointOutcome {
            results: record.results,
            failures,
            cache_hit: false,
        }
    }
}
