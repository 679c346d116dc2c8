use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::UpdateError;
use crate::models::TickerSymbol;

/// Signed sentiment of one article, -1.0 (very negative) to +1.0 (very positive).
pub type SentimentSample = f64;

/// Current sentiment summary for a ticker (`stock_sentiment` row).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SentimentAggregate {
    pub ticker: String,
    pub sentiment_score: f64,
    pub article_count: i32,
    pub updated_at: DateTime<Utc>,
}

/// One immutable observation in `sentiment_history`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SentimentHistoryPoint {
    pub ticker: String,
    pub sentiment_score: f64,
    pub article_count: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Stage of one ticker's update within a cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TickerStage {
    Fetching,
    Scoring,
    Aggregating,
    Persisting,
    Done,
    Skipped,
}

impl std::fmt::Display for TickerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickerStage::Fetching => write!(f, "fetching"),
            TickerStage::Scoring => write!(f, "scoring"),
            TickerStage::Aggregating => write!(f, "aggregating"),
            TickerStage::Persisting => write!(f, "persisting"),
            TickerStage::Done => write!(f, "done"),
            TickerStage::Skipped => write!(f, "skipped"),
        }
    }
}

/// How a ticker's step sequence ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TickerStatus {
    Updated {
        sentiment_score: f64,
        article_count: i32,
    },
    /// Query succeeded but returned nothing; the previous aggregate stays as-is.
    NoArticles,
    Skipped {
        failed_at: TickerStage,
        error: UpdateError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerOutcome {
    pub ticker: TickerSymbol,
    pub status: TickerStatus,
}

impl TickerOutcome {
    pub fn final_stage(&self) -> TickerStage {
        match self.status {
            TickerStatus::Updated { .. } | TickerStatus::NoArticles => TickerStage::Done,
            TickerStatus::Skipped { .. } => TickerStage::Skipped,
        }
    }
}

/// Summary of one full pass over the ticker universe.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated: usize,
    pub no_articles: usize,
    pub rate_limited: usize,
    pub unavailable: usize,
    pub inference_failures: usize,
    pub persistence_failures: usize,
    /// Tickers never started because shutdown was requested mid-cycle.
    pub not_started: usize,
}

impl CycleReport {
    pub fn record(&mut self, outcome: &TickerOutcome) {
        match &outcome.status {
            TickerStatus::Updated { .. } => self.updated += 1,
            TickerStatus::NoArticles => self.no_articles += 1,
            TickerStatus::Skipped { error, .. } => match error {
                UpdateError::RateLimited => self.rate_limited += 1,
                UpdateError::Unavailable(_) => self.unavailable += 1,
                UpdateError::InferenceFailure(_) => self.inference_failures += 1,
                UpdateError::PersistenceFailure(_) => self.persistence_failures += 1,
                // Startup-only; never produced per ticker
                UpdateError::ConfigurationMissing(_) => {}
            },
        }
    }

    pub fn skipped(&self) -> usize {
        self.rate_limited + self.unavailable + self.inference_failures + self.persistence_failures
    }

    pub fn processed(&self) -> usize {
        self.updated + self.no_articles + self.skipped()
    }
}
