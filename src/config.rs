use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

pub const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";

/// Runtime settings for the radar engine.
///
/// Built once at startup and handed to the services that need it; nothing
/// reads the environment after that.
#[derive(Debug, Clone)]
pub struct Config {
    pub serper_api_key: Option<String>,
    pub serper_base_url: String,
    pub language: String,
    pub region: String,
    pub default_radius_km: f64,
    pub max_concurrent_calls: usize,
    pub provider_timeout_secs: u64,
    /// Freshness window for read-through reuse of cached point queries.
    /// Zero keeps the cache as a write-only audit trail.
    pub cache_ttl_secs: u64,
    pub correct_longitude: bool,
    /// Upper bound on records held by the in-process cache store.
    pub memory_cache_max_records: usize,
    pub mongo_uri: Option<String>,
    pub mongo_db_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serper_api_key: None,
            serper_base_url: DEFAULT_SERPER_BASE_URL.to_string(),
            language: "es".to_string(),
            region: "co".to_string(),
            default_radius_km: 2.0,
            max_concurrent_calls: 4,
            provider_timeout_secs: 15,
            cache_ttl_secs: 0,
            correct_longitude: false,
            memory_cache_max_records: 10_000,
            mongo_uri: None,
            mongo_db_name: "radar".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok(); // Load .env file if present
        let defaults = Config::default();
        Config {
            serper_api_key: get_env_opt("SERPER_API_KEY"),
            serper_base_url: get_env_or_default("SERPER_BASE_URL", &defaults.serper_base_url),
            language: get_env_or_default("RADAR_LANGUAGE", &defaults.language),
            region: get_env_or_default("RADAR_REGION", &defaults.region),
            default_radius_km: get_env_parsed("RADAR_DEFAULT_RADIUS_KM", defaults.default_radius_km),
            max_concurrent_calls: get_env_parsed(
                "RADAR_MAX_CONCURRENT_CALLS",
                defaults.max_concurrent_calls,
            )
            .max(1),
            provider_timeout_secs: get_env_parsed(
                "RADAR_PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout_secs,
            ),
            cache_ttl_secs: get_env_parsed("RADAR_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            correct_longitude: get_env_parsed("RADAR_CORRECT_LONGITUDE", defaults.correct_longitude),
            memory_cache_max_records: get_env_parsed(
                "RADAR_MEMORY_CACHE_MAX_RECORDS",
                defaults.memory_cache_max_records,
            ),
            mongo_uri: get_env_opt("MONGO_URI"),
            mongo_db_name: get_env_or_default("MONGO_DB_NAME", &defaults.mongo_db_name),
        }
    }

    pub fn read_through_enabled(&self) -> bool {
        self.cache_ttl_secs > 0
    }

    /// The read-through window, or `None` when it is off or too large to
    /// represent.
    pub fn cache_ttl(&self) -> Option<Duration> {
        if !self.read_through_enabled() {
            return None;
        }
        Duration::try_seconds(i64::try_from(self.cache_ttl_secs).ok()?)
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_env_opt(key).unwrap_or_else(|| default.to_string())
}

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match get_env_opt(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparsable value for {key}: {raw:?}");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_locale_and_radius() {
        let config = Config::default();
        assert_eq!(config.language, "es");
        assert_eq!(config.region, "co");
        assert_eq!(config.default_radius_km, 2.0);
        assert!(!config.read_through_enabled());
        assert!(config.serper_api_key.is_none());
    }

    #[test]
    fn ttl_enables_read_through() {
        let config = Config {
            cache_ttl_secs: 3600,
            ..Config::default()
        };
        assert!(config.read_through_enabled());
        assert_eq!(config.cache_ttl(), Some(Duration::hours(1)));
    }

    #[test]
    fn zero_or_huge_ttl_has_no_window() {
        assert_eq!(Config::default().cache_ttl(), None);
        let huge = Config {
            cache_ttl_secs: u64::MAX,
            ..Config::default()
        };
        assert_eq!(huge.cache_ttl(), None);
    }
}
