use std::sync::Arc;

use clap::Parser;
use radar::api::create_router;
use radar::cache::{CacheStore, MemoryCacheStore};
use radar::config::Config;
use radar::db::{Database, GeoCacheRepo};
use radar::provider::SerperProvider;
use radar::radar::RadarService;

#[derive(Debug, Parser)]
#[command(name = "radar", about = "Geospatial prospect-search service")]
struct Args {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (also picks up log crate records)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    if config.serper_api_key.is_none() {
        tracing::warn!("SERPER_API_KEY is not set; searches will fail until it is configured");
    }

    let cache: Arc<dyn CacheStore> = match Database::from_config(&config).await? {
        Some(db) => Arc::new(GeoCacheRepo::new(&db)),
        None => {
            tracing::warn!("MONGO_URI is not set; geo cache records are kept in memory only");
            Arc::new(MemoryCacheStore::from_config(&config))
        }
    };
    let provider = Arc::new(SerperProvider::new(&config)?);
    let radar = Arc::new(RadarService::new(config, provider, cache));

    let app = create_router(radar);
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    tracing::info!("radar listening on {}", args.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
