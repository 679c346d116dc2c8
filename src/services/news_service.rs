use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{timeout, Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::NewsConfig;
use crate::errors::NewsError;
use crate::external::news_provider::{NewsProvider, NewsQuery};
use crate::models::{Article, TickerSymbol, TrackedTicker};
use crate::services::request_budget::RequestBudget;

#[derive(Debug, Clone)]
struct CachedArticles {
    fetched_at: Instant,
    articles: Vec<Article>,
}

/// News source adapter: one provider, one shared request budget.
pub struct NewsService {
    provider: Arc<dyn NewsProvider>,
    budget: RequestBudget,
    cache: DashMap<TickerSymbol, CachedArticles>,
    lookback: ChronoDuration,
    page_size: usize,
    request_timeout: Duration,
    cache_ttl: Duration,
}

impl NewsService {
    pub fn new(provider: Arc<dyn NewsProvider>, config: &NewsConfig) -> Self {
        info!(
            "📰 News source '{}' ready (budget: {}/day, lookback: {}d, page size: {})",
            provider.name(),
            config.daily_request_limit,
            config.lookback_days,
            config.page_size
        );

        Self {
            provider,
            budget: RequestBudget::new(config.daily_request_limit, config.requests_per_minute),
            cache: DashMap::new(),
            lookback: ChronoDuration::days(config.lookback_days),
            page_size: config.page_size,
            request_timeout: config.timeout,
            cache_ttl: config.cache_ttl,
        }
    }

    /// Fetch recent articles for one ticker.
    ///
    /// Fails with `RateLimited` without contacting the provider once today's
    /// budget is spent. The budget is charged before the request goes out.
    pub async fn fetch(&self, ticker: &TrackedTicker) -> Result<Vec<Article>, NewsError> {
        if let Some(articles) = self.cached(&ticker.symbol) {
            debug!("Serving {} articles for {} from cache", articles.len(), ticker.symbol);
            return Ok(articles);
        }

        let remaining = self.budget.try_acquire().map_err(|e| {
            warn!("News budget exhausted, not querying provider for {}", ticker.symbol);
            e
        })?;
        self.budget.pace().await;

        let query = NewsQuery {
            query: ticker.news_query(),
            published_after: Utc::now() - self.lookback,
            page_size: self.page_size,
        };

        let result = match timeout(self.request_timeout, self.provider.search(&query)).await {
            Ok(result) => result,
            Err(_) => Err(NewsError::Timeout),
        };

        match result {
            Ok(articles) => {
                info!(
                    "Fetched {} articles for {} ({} requests left today)",
                    articles.len(),
                    ticker.symbol,
                    remaining
                );
                self.store_in_cache(&ticker.symbol, &articles);
                Ok(articles)
            }
            Err(NewsError::RateLimited) => {
                warn!("Provider rate-limited request for {}; skipping it this cycle", ticker.symbol);
                Err(NewsError::RateLimited)
            }
            Err(NewsError::QuotaExhausted) => {
                warn!("Provider reports the daily quota spent at {}; budget closed for today", ticker.symbol);
                self.budget.mark_exhausted();
                Err(NewsError::QuotaExhausted)
            }
            Err(e) => Err(e),
        }
    }

    pub fn remaining_budget(&self) -> u32 {
        self.budget.remaining()
    }

    fn cached(&self, symbol: &TickerSymbol) -> Option<Vec<Article>> {
        if self.cache_ttl.is_zero() {
            return None;
        }

        let entry = self.cache.get(symbol)?;
        if entry.fetched_at.elapsed() < self.cache_ttl {
            return Some(entry.articles.clone());
        }

        drop(entry); // Release the read lock before removing
        self.cache.remove(symbol);
        None
    }

    fn store_in_cache(&self, symbol: &TickerSymbol, articles: &[Article]) {
        if self.cache_ttl.is_zero() {
            return;
        }

        self.cache.insert(
            symbol.clone(),
            CachedArticles {
                fetched_at: Instant::now(),
                articles: articles.to_vec(),
            },
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: per-query responses, counts every call.
    #[derive(Default)]
    pub(crate) struct ScriptedNewsProvider {
        responses: Mutex<HashMap<String, Result<Vec<Article>, NewsError>>>,
        pub calls: AtomicUsize,
        /// When set, every call after this many succeeds with a rate-limit response.
        pub rate_limit_after: Option<usize>,
    }

    impl ScriptedNewsProvider {
        pub fn respond(&self, symbol: &str, response: Result<Vec<Article>, NewsError>) {
            self.responses.lock().insert(symbol.to_string(), response);
        }
    }

    #[async_trait]
    impl NewsProvider for ScriptedNewsProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn search(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if matches!(self.rate_limit_after, Some(limit) if call >= limit) {
                return Err(NewsError::RateLimited);
            }

            let symbol = query.query.split_whitespace().next().unwrap_or_default();
            self.responses
                .lock()
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    pub(crate) fn article(text: &str) -> Article {
        Article {
            headline: Some(text.to_string()),
            description: None,
            published_at: Utc::now(),
            source: Some("Test Wire".to_string()),
            url: None,
        }
    }

    pub(crate) fn news_config(daily_limit: u32) -> NewsConfig {
        NewsConfig {
            api_key: "test".to_string(),
            base_url: "http://localhost".to_string(),
            lookback_days: 7,
            page_size: 20,
            daily_request_limit: daily_limit,
            requests_per_minute: 6000,
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::ZERO,
        }
    }

    fn tracked(symbol: &str) -> TrackedTicker {
        TrackedTicker::new(TickerSymbol::parse(symbol).unwrap(), "")
    }

    #[tokio::test]
    async fn test_fetch_returns_provider_articles() {
        let provider = Arc::new(ScriptedNewsProvider::default());
        provider.respond("AAPL", Ok(vec![article("Apple beats"), article("Apple ships")]));
        let service = NewsService::new(provider.clone(), &news_config(10));

        let articles = service.fetch(&tracked("AAPL")).await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(service.remaining_budget(), 9);
    }

    #[tokio::test]
    async fn test_failed_attempts_still_consume_budget() {
        let provider = Arc::new(ScriptedNewsProvider::default());
        provider.respond("AAPL", Err(NewsError::Network("connection reset".into())));
        let service = NewsService::new(provider.clone(), &news_config(2));

        assert!(matches!(service.fetch(&tracked("AAPL")).await, Err(NewsError::Network(_))));
        assert!(service.fetch(&tracked("AAPL")).await.is_err());
        assert_eq!(service.fetch(&tracked("AAPL")).await, Err(NewsError::RateLimited));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2, "exhausted budget must not call out");
    }

    #[tokio::test]
    async fn test_provider_rate_limit_keeps_budget_open() {
        let provider = Arc::new(ScriptedNewsProvider::default());
        provider.respond("AAPL", Err(NewsError::RateLimited));
        provider.respond("NVDA", Ok(vec![article("Nvidia ships")]));
        let service = NewsService::new(provider.clone(), &news_config(100));

        assert_eq!(service.fetch(&tracked("AAPL")).await, Err(NewsError::RateLimited));
        assert_eq!(service.fetch(&tracked("NVDA")).await.unwrap().len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.remaining_budget(), 98);
    }

    #[tokio::test]
    async fn test_quota_exhausted_closes_budget() {
        let provider = Arc::new(ScriptedNewsProvider::default());
        provider.respond("AAPL", Err(NewsError::QuotaExhausted));
        provider.respond("NVDA", Ok(vec![article("Nvidia ships")]));
        let service = NewsService::new(provider.clone(), &news_config(100));

        assert_eq!(service.fetch(&tracked("AAPL")).await, Err(NewsError::QuotaExhausted));
        assert_eq!(service.fetch(&tracked("NVDA")).await, Err(NewsError::RateLimited));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.remaining_budget(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_budget() {
        let provider = Arc::new(ScriptedNewsProvider::default());
        provider.respond("AAPL", Ok(vec![article("Apple beats")]));
        let mut config = news_config(5);
        config.cache_ttl = Duration::from_secs(600);
        let service = NewsService::new(provider.clone(), &config);

        service.fetch(&tracked("AAPL")).await.unwrap();
        let again = service.fetch(&tracked("AAPL")).await.unwrap();

        assert_eq!(again.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.remaining_budget(), 4);
    }

    struct HangingProvider;

    #[async_trait]
    impl NewsProvider for HangingProvider {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn search(&self, _query: &NewsQuery) -> Result<Vec<Article>, NewsError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let service = NewsService::new(Arc::new(HangingProvider), &news_config(5));
        assert_eq!(service.fetch(&tracked("AAPL")).await, Err(NewsError::Timeout));
    }
}
