use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::options::ClientOptions;
use mongodb::{
    Client, Collection, Database as MongoDatabase,
    bson::{self, Document, doc, oid::ObjectId},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::data_models::{CacheRecord, GeoCacheDoc, RawPlaceResult};
use crate::error::RadarError;

/// Collection names as constants for consistency
pub mod collections {
    pub const GEO_CACHE: &str = "geo_intelligence_cache";
}

/// Main database wrapper providing connection management and collection access
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: MongoDatabase,
}

impl Database {
    /// Create a new Database instance with custom URI and database name.
    /// Useful for testing with a different database.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let client =
            Client::with_options(client_options).context("Failed to create MongoDB client")?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        log::info!("Connected to MongoDB database: {}", db_name);

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Connect using the injected configuration. Returns `None` when no
    /// `MONGO_URI` is configured.
    pub async fn from_config(config: &Config) -> Result<Option<Self>> {
        match &config.mongo_uri {
            Some(uri) => Ok(Some(Self::new(uri, &config.mongo_db_name).await?)),
            None => Ok(None),
        }
    }

    /// Get a typed collection by name
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    /// Get the underlying MongoDB client (for advanced operations)
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn geo_cache(&self) -> Collection<GeoCacheDoc> {
        self.collection(collections::GEO_CACHE)
    }
}

// =============================================================================
// Generic operations
// =============================================================================

pub struct Repository<T>
where
    T: Send + Sync,
{
    collection: Collection<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }

    /// Insert a single document
    pub async fn insert(&self, doc: &T) -> Result<ObjectId> {
        let result = self
            .collection
            .insert_one(doc)
            .await
            .context("Failed to insert document")?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted ObjectId"))
    }

    /// Newest document matching a filter, ordered by `sort_field`
    pub async fn find_latest(&self, filter: Document, sort_field: &str) -> Result<Option<T>> {
        let mut sort = Document::new();
        sort.insert(sort_field, -1);
        self.collection
            .find_one(filter)
            .sort(sort)
            .await
            .context("Failed to find document")
    }

    /// Find all documents matching a filter
    #[cfg(test)]
    pub async fn find(&self, filter: Document) -> Result<Vec<T>> {
        use futures::TryStreamExt;

        let cursor = self
            .collection
            .find(filter)
            .await
            .context("Failed to execute find query")?;

        cursor
            .try_collect()
            .await
            .context("Failed to collect results")
    }

    /// Count documents matching a filter
    #[cfg(test)]
    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.collection
            .count_documents(filter)
            .await
            .context("Failed to count documents")
    }
}

// =============================================================================
// Geo cache operations
// =============================================================================

/// MongoDB-backed [`CacheStore`].
pub struct GeoCacheRepo {
    repo: Repository<GeoCacheDoc>,
}

impl GeoCacheRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            repo: Repository::new(db.geo_cache()),
        }
    }

    pub async fn insert(&self, record: &CacheRecord) -> Result<ObjectId> {
        self.repo.insert(&GeoCacheDoc::from(record)).await
    }

    pub async fn latest_since(
        &self,
        cell_key: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<CacheRecord>> {
        let filter = doc! {
            "cell_key": cell_key,
            "recorded_at": { "$gte": bson::DateTime::from_millis(fresh_since.timestamp_millis()) },
        };
        Ok(self
            .repo
            .find_latest(filter, "recorded_at")
            .await?
            .map(CacheRecord::from))
    }
}

// Audit queries, only used to inspect what a search wrote.
#[cfg(test)]
impl GeoCacheRepo {
    pub async fn find_by_search(&self, search_id: &str) -> Result<Vec<CacheRecord>> {
        Ok(self
            .repo
            .find(doc! { "search_id": search_id })
            .await?
            .into_iter()
            .map(CacheRecord::from)
            .collect())
    }

    pub async fn count_for_keyword(&self, keyword: &str) -> Result<u64> {
        self.repo.count(doc! { "keyword": keyword }).await
    }
}

#[async_trait]
impl CacheStore for GeoCacheRepo {
    async fn record(&self, record: &CacheRecord) -> Result<(), RadarError> {
        let id = self
            .insert(record)
            .await
            .map_err(|e| RadarError::Persistence(format!("{e:#}")))?;
        log::debug!("recorded geo cache entry {:?} for {}", id, record.cell_key());
        Ok(())
    }

    async fn lookup(
        &self,
        cell_key: &str,
        fresh_since: DateTime<Utc>,
    ) -> Result<Option<Vec<RawPlaceResult>>, RadarError> {
        self.latest_since(cell_key, fresh_since)
            .await
            .map(|found| found.map(|record| record.results))
            .map_err(|e| RadarError::Persistence(format!("{e:#}")))
    }
}

// =============================================================================
// Test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Create a unique test database name
    pub fn unique_test_db_name() -> String {
        let count = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis();
        format!("radar_test_{}_{}", timestamp, count)
    }

    /// Create a test database instance.
    /// Uses MONGO_URI from environment but creates a unique test database.
    pub async fn create_test_db() -> Result<(Database, String)> {
        dotenvy::dotenv().ok();
        let uri =
            std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = unique_test_db_name();
        let db = Database::new(&uri, &db_name).await?;
        Ok((db, db_name))
    }

    /// Clean up a test database by dropping it
    pub async fn cleanup_test_db(db: &Database, db_name: &str) -> Result<()> {
        db.client()
            .database(db_name)
            .drop()
            .await
            .context("Failed to drop test database")?;
        Ok(())
    }
}
