use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::UpdateError;
use crate::models::TickerUniverse;

/// Configuration for the news source adapter
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: String,
    pub base_url: String,
    pub lookback_days: i64,
    pub page_size: usize,
    pub daily_request_limit: u32,
    pub requests_per_minute: u32,
    pub timeout: Duration,
    /// Zero disables the article cache.
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    FinBert,
    Lexicon,
}

impl FromStr for ModelBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finbert" => Ok(ModelBackend::FinBert),
            "lexicon" => Ok(ModelBackend::Lexicon),
            other => Err(format!("unknown sentiment model '{}' (expected finbert or lexicon)", other)),
        }
    }
}

/// Configuration for the sentiment scorer
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub endpoint: String,
    pub api_token: Option<String>,
    pub lexicon_path: Option<PathBuf>,
    pub batch_size: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub ticker_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub news: NewsConfig,
    pub model: ModelConfig,
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub api_addr: SocketAddr,
    pub universe: TickerUniverse,
}

const DEFAULT_NEWS_BASE_URL: &str = "https://newsapi.org/v2";
const DEFAULT_MODEL_ENDPOINT: &str = "https://api-inference.huggingface.co/models/ProsusAI/finbert";
pub const MAX_TICKER_CONCURRENCY: usize = 5;
const MAX_LOOKBACK_DAYS: i64 = 365;

impl AppConfig {
    pub fn from_env() -> Result<Self, UpdateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate the configuration from an arbitrary variable source.
    ///
    /// Missing credentials and malformed values are both reported as
    /// `ConfigurationMissing`, the only fatal error of the service.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, UpdateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("NEWS_API_KEY").ok_or_else(|| missing("NEWS_API_KEY"))?;
        let database_url = get("DATABASE_URL").ok_or_else(|| missing("DATABASE_URL"))?;
        validate_database_url(&database_url)?;

        let news = NewsConfig {
            api_key,
            base_url: get("NEWS_API_BASE_URL").unwrap_or_else(|| DEFAULT_NEWS_BASE_URL.to_string()),
            lookback_days: parse_or(&get, "NEWS_LOOKBACK_DAYS", 7)?,
            page_size: parse_or::<usize>(&get, "NEWS_PAGE_SIZE", 20)?.clamp(1, 100),
            daily_request_limit: parse_or(&get, "NEWS_DAILY_REQUEST_LIMIT", 100)?,
            requests_per_minute: parse_or::<u32>(&get, "NEWS_REQUESTS_PER_MINUTE", 30)?.max(1),
            timeout: Duration::from_secs(parse_or(&get, "NEWS_TIMEOUT_SECS", 15)?),
            cache_ttl: minutes_or(&get, "NEWS_CACHE_TTL_MINUTES", 0)?,
        };
        if !(1..=MAX_LOOKBACK_DAYS).contains(&news.lookback_days) {
            return Err(invalid(
                "NEWS_LOOKBACK_DAYS",
                &format!("must be between 1 and {}", MAX_LOOKBACK_DAYS),
            ));
        }

        let model = ModelConfig {
            backend: parse_or(&get, "SENTIMENT_MODEL", ModelBackend::FinBert)?,
            endpoint: get("MODEL_ENDPOINT").unwrap_or_else(|| DEFAULT_MODEL_ENDPOINT.to_string()),
            api_token: get("HUGGINGFACE_TOKEN"),
            lexicon_path: get("SENTIMENT_LEXICON_PATH").map(PathBuf::from),
            batch_size: parse_or::<usize>(&get, "INFERENCE_BATCH_SIZE", 16)?.max(1),
            timeout: Duration::from_secs(parse_or(&get, "INFERENCE_TIMEOUT_SECS", 60)?),
        };

        let store = StoreConfig {
            database_url,
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?,
            timeout: Duration::from_secs(parse_or(&get, "STORE_TIMEOUT_SECS", 10)?),
        };

        let interval = minutes_or(&get, "UPDATE_INTERVAL_MINUTES", 30)?;
        if interval.is_zero() {
            return Err(invalid("UPDATE_INTERVAL_MINUTES", "must be at least 1"));
        }
        let scheduler = SchedulerConfig {
            interval,
            ticker_concurrency: parse_or::<usize>(&get, "TICKER_CONCURRENCY", 1)?
                .clamp(1, MAX_TICKER_CONCURRENCY),
        };

        let api_addr = parse_or(&get, "API_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let universe = match get("TRACKED_TICKERS") {
            Some(list) => TickerUniverse::parse(&list).map_err(|e| invalid("TRACKED_TICKERS", &e))?,
            None => TickerUniverse::default_universe(),
        };

        Ok(Self {
            news,
            model,
            store,
            scheduler,
            api_addr,
            universe,
        })
    }
}

fn missing(key: &str) -> UpdateError {
    UpdateError::ConfigurationMissing(format!("{} must be set", key))
}

fn invalid(key: &str, reason: &str) -> UpdateError {
    UpdateError::ConfigurationMissing(format!("{} is invalid: {}", key, reason))
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, UpdateError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| invalid(key, &e.to_string())),
        None => Ok(default),
    }
}

fn minutes_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, UpdateError> {
    let minutes: u64 = parse_or(get, key, default)?;
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(key, "too large"))
}

fn validate_database_url(raw: &str) -> Result<(), UpdateError> {
    let url = url::Url::parse(raw).map_err(|e| invalid("DATABASE_URL", &e.to_string()))?;

    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(invalid("DATABASE_URL", "scheme must be postgres:// or postgresql://"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("DATABASE_URL", "missing host"));
    }
    if url.username().is_empty() {
        return Err(invalid("DATABASE_URL", "missing credentials"));
    }

    Ok(())
}
