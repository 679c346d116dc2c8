//! Sentiment Update Job
//!
//! One run of this job is a *cycle*: a single pass over the tracked ticker
//! universe. For every ticker the job fetches recent news, scores each
//! article with the shared sentiment model, reduces the samples to one
//! aggregate and writes it to the store.
//!
//! # Per-ticker flow
//!
//! `Fetching → Scoring → Aggregating → Persisting → Done`, with a jump to
//! `Skipped` from any stage when a classified error occurs.
//!
//! # Error Handling
//!
//! - A failing ticker is logged with its stage and classification, then the
//!   cycle moves on. Nothing a single ticker does can abort the cycle.
//! - A ticker with zero articles is not an error: no write happens and the
//!   previous aggregate (with its older `updated_at`) stays visible.
//! - There is no retry inside a cycle; the next cycle is the retry.
//!
//! # Concurrency
//!
//! Tickers run with bounded concurrency (1–5) so the shared news budget is
//! spent predictably. Shutdown is honored between tickers: in-flight tickers
//! finish, no new ticker starts.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::MAX_TICKER_CONCURRENCY;
use crate::errors::UpdateError;
use crate::models::{
    Article, CycleReport, TickerOutcome, TickerStage, TickerStatus, TickerUniverse, TrackedTicker,
};
use crate::services::aggregator::aggregate;
use crate::services::job_scheduler_service::CycleRunner;
use crate::services::news_service::NewsService;
use crate::services::sentiment_scorer::SentimentScorer;
use crate::store::SentimentStore;

pub struct SentimentUpdateJob {
    universe: TickerUniverse,
    news: Arc<NewsService>,
    scorer: Arc<SentimentScorer>,
    store: Arc<dyn SentimentStore>,
    concurrency: usize,
}

impl SentimentUpdateJob {
    pub fn new(
        universe: TickerUniverse,
        news: Arc<NewsService>,
        scorer: Arc<SentimentScorer>,
        store: Arc<dyn SentimentStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            universe,
            news,
            scorer,
            store,
            concurrency: concurrency.clamp(1, MAX_TICKER_CONCURRENCY),
        }
    }

    /// Run every step for one ticker and classify how it ended.
    pub async fn process_ticker(&self, ticker: &TrackedTicker) -> TickerOutcome {
        let mut stage = TickerStage::Fetching;

        let status = match self.run_steps(ticker, &mut stage).await {
            Ok(status) => status,
            Err(error) => TickerStatus::Skipped {
                failed_at: stage,
                error,
            },
        };

        match &status {
            TickerStatus::Updated {
                sentiment_score,
                article_count,
            } => info!(
                "✓ Updated {} | Sentiment: {:.3} | Articles: {}",
                ticker.symbol, sentiment_score, article_count
            ),
            TickerStatus::NoArticles => {
                warn!(ticker = %ticker.symbol, "No articles found for {}, keeping previous value", ticker.symbol)
            }
            TickerStatus::Skipped { failed_at, error } => warn!(
                ticker = %ticker.symbol,
                stage = %failed_at,
                classification = error.classification(),
                "⏭️ Skipping {} this cycle: {}",
                ticker.symbol,
                error
            ),
        }

        let outcome = TickerOutcome {
            ticker: ticker.symbol.clone(),
            status,
        };
        debug!(ticker = %outcome.ticker, stage = %outcome.final_stage(), "Ticker finished");
        outcome
    }

    async fn run_steps(
        &self,
        ticker: &TrackedTicker,
        stage: &mut TickerStage,
    ) -> Result<TickerStatus, UpdateError> {
        *stage = TickerStage::Fetching;
        let articles = self.news.fetch(ticker).await?;
        if articles.is_empty() {
            return Ok(TickerStatus::NoArticles);
        }

        *stage = TickerStage::Scoring;
        let texts: Vec<String> = articles.iter().map(Article::scoring_text).collect();
        let samples = self.scorer.score(&texts).await?;

        *stage = TickerStage::Aggregating;
        let Some(result) = aggregate(&samples) else {
            return Ok(TickerStatus::NoArticles);
        };

        *stage = TickerStage::Persisting;
        // Postgres keeps microseconds; truncate so stored and reported times match
        let now = Utc::now().trunc_subsecs(6);
        let symbol = &ticker.symbol;

        // Both writes are attempted even if the other fails
        let (upserted, appended) = tokio::join!(
            self.store
                .upsert_aggregate(symbol, result.sentiment_score, result.article_count, now),
            self.store
                .append_history(symbol, result.sentiment_score, result.article_count, now),
        );

        match (upserted, appended) {
            (Ok(()), Ok(())) => Ok(TickerStatus::Updated {
                sentiment_score: result.sentiment_score,
                article_count: result.article_count,
            }),
            (Err(e), history) => {
                if let Err(h) = history {
                    error!("Could not save history for {}: {}", symbol, h);
                }
                Err(e.into())
            }
            (Ok(()), Err(e)) => Err(e.into()),
        }
    }

    /// One full pass over the universe.
    pub async fn run_cycle(&self, cycle: u64, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let tickers = self.universe.tickers();
        let mut report = CycleReport {
            cycle,
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        info!(
            "Processing {} tickers with '{}' (concurrency: {}, news budget left: {})",
            tickers.len(),
            self.scorer.model_name(),
            self.concurrency,
            self.news.remaining_budget()
        );

        let mut pending = tickers.iter();
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes: Vec<TickerOutcome> = Vec::with_capacity(tickers.len());

        loop {
            // Top up to the concurrency limit; no new ticker once shutdown is requested
            while in_flight.len() < self.concurrency {
                let stopping = *shutdown.borrow();
                if stopping {
                    break;
                }
                match pending.next() {
                    Some(ticker) => in_flight.push(self.process_ticker(ticker)),
                    None => break,
                }
            }

            match in_flight.next().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }

        for outcome in &outcomes {
            report.record(outcome);
        }
        report.not_started = tickers.len() - outcomes.len();
        report.finished_at = Some(Utc::now());

        if report.not_started > 0 {
            warn!(
                "🛑 Shutdown requested, {} tickers not started in cycle #{}",
                report.not_started, cycle
            );
        }

        report
    }
}

#[async_trait]
impl CycleRunner for SentimentUpdateJob {
    async fn run_cycle(&self, cycle: u64, shutdown: &watch::Receiver<bool>) -> CycleReport {
        SentimentUpdateJob::run_cycle(self, cycle, shutdown).await
    }
}
