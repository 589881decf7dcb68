use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A WGS84 coordinate in decimal degrees. Used both for the search center and
/// for the grid points derived from it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

pub type GridPoint = GeoPoint;

/// A validated search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub keyword: String,
    pub center: GeoPoint,
    pub radius_km: f64,
}

/// One place record as returned by the search provider.
///
/// Only the fields the aggregator needs are typed; everything else the
/// provider sends (rating, phone number, cid, ...) is kept in `extra` and
/// written back out untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RawPlaceResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawPlaceResult {
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.address)
    }

    /// The record's own coordinates, with any missing component taken from
    /// `fallback`.
    pub fn position_or(&self, fallback: GeoPoint) -> GeoPoint {
        GeoPoint {
            lat: self.latitude.unwrap_or(fallback.lat),
            lng: self.longitude.unwrap_or(fallback.lng),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Cold,
    Qualified,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Lead {
    #[serde(flatten)]
    pub place: RawPlaceResult,
    pub distance_km: f64,
    pub status: LeadStatus,
}

impl Lead {
    /// Keys a lead serializes itself; provider fields with these names are dropped.
    pub const RESERVED_KEYS: [&'static str; 2] = ["distance_km", "status"];

    /// An unclassified (`cold`) lead.
    pub fn new(mut place: RawPlaceResult, distance_km: f64) -> Lead {
        for key in Self::RESERVED_KEYS {
            place.extra.remove(key);
        }
        Lead {
            place,
            distance_km,
            status: LeadStatus::Cold,
        }
    }
}

/// The raw results of one provider query, kept for audit and reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub search_id: String,
    pub point: GridPoint,
    pub keyword: String,
    pub radius_km: f64,
    pub results: Vec<RawPlaceResult>,
    pub recorded_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(
        search_id: String,
        point: GridPoint,
        keyword: String,
        radius_km: f64,
        results: Vec<RawPlaceResult>,
    ) -> CacheRecord {
        CacheRecord {
            search_id,
            point,
            keyword,
            radius_km,
            results,
            recorded_at: Utc::now(),
        }
    }

    pub fn cell_key(&self) -> String {
        cell_key(self.point, &self.keyword, self.radius_km)
    }
}

/// Quantized lookup key for a point query: ~11 m in position, 0.1 km in radius.
pub fn cell_key(point: GridPoint, keyword: &str, radius_km: f64) -> String {
    format!(
        "{:.4}:{:.4}:{}:{:.1}",
        point.lat, point.lng, keyword, radius_km
    )
}

/// MongoDB shape of a [`CacheRecord`] (`geo_intelligence_cache` collection).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GeoCacheDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub search_id: String,
    pub cell_key: String,
    pub lat: f64,
    pub lng: f64,
    pub keyword: String,
    pub radius: f64,
    pub results: Vec<RawPlaceResult>,
    pub recorded_at: bson::DateTime,
}

impl From<&CacheRecord> for GeoCacheDoc {
    fn from(record: &CacheRecord) -> Self {
        GeoCacheDoc {
            id: ObjectId::new(),
            search_id: record.search_id.clone(),
            cell_key: record.cell_key(),
            lat: record.point.lat,
            lng: record.point.lng,
            keyword: record.keyword.clone(),
            radius: record.radius_km,
            results: record.results.clone(),
            recorded_at: bson::DateTime::from_millis(record.recorded_at.timestamp_millis()),
        }
    }
}

impl From<GeoCacheDoc> for CacheRecord {
    fn from(doc: GeoCacheDoc) -> Self {
        CacheRecord {
            search_id: doc.search_id,
            point: GeoPoint::new(doc.lat, doc.lng),
            keyword: doc.keyword,
            radius_km: doc.radius,
            results: doc.results,
            recorded_at: DateTime::from_timestamp_millis(doc.recorded_at.timestamp_millis())
                .unwrap_or_else(Utc::now),
        }
    }
}
