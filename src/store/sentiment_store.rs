use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::future::Future;
use tokio::time::{timeout, Duration};

use crate::db::sentiment_queries;
use crate::errors::StoreError;
use crate::models::{SentimentAggregate, SentimentHistoryPoint, TickerSymbol};

/// Persistence gateway for sentiment aggregates and their history.
///
/// Implementations never retry; the update cycle owns retry policy.
#[async_trait]
pub trait SentimentStore: Send + Sync {
    /// Idempotent overwrite of the ticker's current aggregate.
    async fn upsert_aggregate(
        &self,
        ticker: &TickerSymbol,
        sentiment_score: f64,
        article_count: i32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Insert-only; never modifies an existing history point.
    async fn append_history(
        &self,
        ticker: &TickerSymbol,
        sentiment_score: f64,
        article_count: i32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_aggregates(&self) -> Result<Vec<SentimentAggregate>, StoreError>;

    async fn get_aggregate(&self, ticker: &TickerSymbol) -> Result<Option<SentimentAggregate>, StoreError>;

    async fn history(
        &self,
        ticker: &TickerSymbol,
        since: DateTime<Utc>,
    ) -> Result<Vec<SentimentHistoryPoint>, StoreError>;
}

/// Postgres-backed store (`stock_sentiment` + `sentiment_history`).
pub struct PgSentimentStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgSentimentStore {
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl SentimentStore for PgSentimentStore {
    async fn upsert_aggregate(
        &self,
        ticker: &TickerSymbol,
        sentiment_score: f64,
        article_count: i32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.bounded(sentiment_queries::upsert_aggregate(
            &self.pool,
            ticker.as_str(),
            sentiment_score,
            article_count,
            now,
        ))
        .await
    }

    async fn append_history(
        &self,
        ticker: &TickerSymbol,
        sentiment_score: f64,
        article_count: i32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let inserted = self
            .bounded(sentiment_queries::insert_history(
                &self.pool,
                ticker.as_str(),
                sentiment_score,
                article_count,
                now,
            ))
            .await?;

        if !inserted {
            tracing::warn!("History point for {} at {} already exists, kept original", ticker, now);
        }
        Ok(())
    }

    async fn list_aggregates(&self) -> Result<Vec<SentimentAggregate>, StoreError> {
        self.bounded(sentiment_queries::fetch_all_aggregates(&self.pool)).await
    }

    async fn get_aggregate(&self, ticker: &TickerSymbol) -> Result<Option<SentimentAggregate>, StoreError> {
        self.bounded(sentiment_queries::fetch_aggregate(&self.pool, ticker.as_str()))
            .await
    }

    async fn history(
        &self,
        ticker: &TickerSymbol,
        since: DateTime<Utc>,
    ) -> Result<Vec<SentimentHistoryPoint>, StoreError> {
        self.bounded(sentiment_queries::fetch_history(&self.pool, ticker.as_str(), since))
            .await
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashSet};

    /// In-process store with per-ticker failure injection.
    #[derive(Default)]
    pub(crate) struct InMemorySentimentStore {
        aggregates: Mutex<BTreeMap<String, SentimentAggregate>>,
        history: Mutex<Vec<SentimentHistoryPoint>>,
        pub fail_upserts_for: Mutex<HashSet<String>>,
        pub fail_history_for: Mutex<HashSet<String>>,
    }

    impl InMemorySentimentStore {
        pub fn seed_aggregate(&self, aggregate: SentimentAggregate) {
            self.aggregates.lock().insert(aggregate.ticker.clone(), aggregate);
        }

        pub fn aggregate(&self, ticker: &str) -> Option<SentimentAggregate> {
            self.aggregates.lock().get(ticker).cloned()
        }

        pub fn history_for(&self, ticker: &str) -> Vec<SentimentHistoryPoint> {
            self.history
                .lock()
                .iter()
                .filter(|p| p.ticker == ticker)
                .cloned()
                .collect()
        }

        pub fn history_len(&self) -> usize {
            self.history.lock().len()
        }
    }

    #[async_trait]
    impl SentimentStore for InMemorySentimentStore {
        async fn upsert_aggregate(
            &self,
            ticker: &TickerSymbol,
            sentiment_score: f64,
            article_count: i32,
            now: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.fail_upserts_for.lock().contains(ticker.as_str()) {
                return Err(StoreError::Timeout);
            }

            self.aggregates.lock().insert(
                ticker.to_string(),
                SentimentAggregate {
                    ticker: ticker.to_string(),
                    sentiment_score,
                    article_count,
                    updated_at: now,
                },
            );
            Ok(())
        }

        async fn append_history(
            &self,
            ticker: &TickerSymbol,
            sentiment_score: f64,
            article_count: i32,
            now: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            if self.fail_history_for.lock().contains(ticker.as_str()) {
                return Err(StoreError::Timeout);
            }

            let mut history = self.history.lock();
            let exists = history
                .iter()
                .any(|p| p.ticker == ticker.as_str() && p.recorded_at == now);
            if !exists {
                history.push(SentimentHistoryPoint {
                    ticker: ticker.to_string(),
                    sentiment_score,
                    article_count,
                    recorded_at: now,
                });
            }
            Ok(())
        }

        async fn list_aggregates(&self) -> Result<Vec<SentimentAggregate>, StoreError> {
            let mut rows: Vec<_> = self.aggregates.lock().values().cloned().collect();
            rows.sort_by(|a, b| {
                b.sentiment_score
                    .total_cmp(&a.sentiment_score)
                    .then_with(|| a.ticker.cmp(&b.ticker))
            });
            Ok(rows)
        }

        async fn get_aggregate(&self, ticker: &TickerSymbol) -> Result<Option<SentimentAggregate>, StoreError> {
            Ok(self.aggregate(ticker.as_str()))
        }

        async fn history(
            &self,
            ticker: &TickerSymbol,
            since: DateTime<Utc>,
        ) -> Result<Vec<SentimentHistoryPoint>, StoreError> {
            let mut points: Vec<_> = self
                .history_for(ticker.as_str())
                .into_iter()
                .filter(|p| p.recorded_at >= since)
                .collect();
            points.sort_by_key(|p| p.recorded_at);
            Ok(points)
        }
    }
}
