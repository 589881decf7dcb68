use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::Config;
use crate::data_models::{CacheRecord, RawPlaceResult};
use crate::error::RadarError;

/// Append-only store of raw point queries.
///
/// Writers never touch an existing record, so implementations only need
/// whatever atomicity their single-record insert already gives.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn record(&self, record: &CacheRecord) -> Result<(), RadarError>;

    /// Most recent results recorded for `cell_key` at or after `fresh_since`.
    async fn lookup(
        &self,
        cell_key: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<Vec<RawPlaceResult>>, RadarError>;
}

/// In-process store, keyed by cell. Used when no MongoDB is configured.
///
/// Holds at most `max_records` records; the oldest writes are evicted first.
/// With a retention window, records older than the window are also dropped
/// as new ones arrive.
#[derive(Debug)]
pub struct MemoryCacheStore {
    records: DashMap<String, VecDeque<CacheRecord>>,
    // Write order across all cells, oldest first. Every mutation happens
    // while this lock is held, so the front entry is always the front of
    // its cell.
    order: Mutex<VecDeque<(String, DateTime<Utc>)>>,
    max_records: usize,
    retention: Option<Duration>,
}

pub const DEFAULT_MAX_RECORDS: usize = 10_000;

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_RECORDS, None)
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_records: usize, retention: Option<Duration>) -> Self {
        Self {
            records: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_records,
            retention,
        }
    }

    /// Keeps records only while read-through can still reuse them. With
    /// read-through off nothing would ever read them back, so nothing is kept.
    pub fn from_config(config: &Config) -> Self {
        match config.cache_ttl() {
            Some(ttl) => Self::with_limits(config.memory_cache_max_records, Some(ttl)),
            None if config.read_through_enabled() => {
                Self::with_limits(config.memory_cache_max_records, None)
            }
            None => Self::with_limits(0, None),
        }
    }

    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every retained record written by one search invocation.
    pub fn records_for_search(&self, search_id: &str) -> Vec<CacheRecord> {
        self.records
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|r| r.search_id == search_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn evict_oldest(&self, cell_key: &str) {
        if let Some(mut cell) = self.records.get_mut(cell_key) {
            cell.pop_front();
        }
        self.records.remove_if(cell_key, |_, cell| cell.is_empty());
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn record(&self, record: &CacheRecord) -> Result<(), RadarError> {
        if self.max_records == 0 {
            return Ok(());
        }

        let mut order = self
            .order
            .lock()
            .map_err(|_| RadarError::Persistence("memory cache lock poisoned".to_string()))?;

        let key = record.cell_key();
        self.records
            .entry(key.clone())
            .or_default()
            .push_back(record.clone());
        order.push_back((key, record.recorded_at));

        let cutoff = self
            .retention
            .and_then(|retention| Utc::now().checked_sub_signed(retention));
        loop {
            let expired = match (order.front(), cutoff) {
                (Some((_, recorded_at)), Some(cutoff)) => *recorded_at < cutoff,
                _ => false,
            };
            if !expired && order.len() <= self.max_records {
                break;
            }
            let Some((key, _)) = order.pop_front() else {
                break;
            };
            self.evict_oldest(&key);
        }
        Ok(())
    }

    async fn lookup(
        &self,
        cell_key: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<Vec<RawPlaceResult>>, RadarError> {
        Ok(self.records.get(cell_key).and_then(|records| {
            records
                .iter()
                .filter(|r| r.recorded_at >= fresh_since)
                .max_by_key(|r| r.recorded_at)
                .map(|r| r.results.clone())
        }))
    }
}
