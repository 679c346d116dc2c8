use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{SentimentAggregate, SentimentHistoryPoint, TickerSymbol};
use crate::state::AppState;

const MAX_HISTORY_DAYS: i64 = 365;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sentiment))
        .route("/:ticker", get(get_sentiment))
        .route("/:ticker/history", get(get_history))
}

/// Query parameters for sentiment history
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Trailing window in days (default: 7)
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

fn parse_ticker(raw: &str) -> Result<TickerSymbol, AppError> {
    TickerSymbol::parse(raw).map_err(AppError::Validation)
}

/// GET /api/sentiment
pub async fn list_sentiment(
    State(state): State<AppState>,
) -> Result<Json<Vec<SentimentAggregate>>, AppError> {
    info!("GET /api/sentiment - Listing all aggregates");
    let rows = state.store.list_aggregates().await?;
    Ok(Json(rows))
}

/// GET /api/sentiment/:ticker
pub async fn get_sentiment(
    Path(ticker): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SentimentAggregate>, AppError> {
    info!("GET /api/sentiment/{} - Getting aggregate", ticker);
    let ticker = parse_ticker(&ticker)?;

    state
        .store
        .get_aggregate(&ticker)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// GET /api/sentiment/:ticker/history?days=N
pub async fn get_history(
    Path(ticker): Path<String>,
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SentimentHistoryPoint>>, AppError> {
    info!("GET /api/sentiment/{}/history - days={}", ticker, params.days);
    let ticker = parse_ticker(&ticker)?;

    if !(1..=MAX_HISTORY_DAYS).contains(&params.days) {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {}",
            MAX_HISTORY_DAYS
        )));
    }

    let since = Utc::now() - Duration::days(params.days);
    let points = state.store.history(&ticker, since).await?;
    Ok(Json(points))
}
