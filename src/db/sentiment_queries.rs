use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{SentimentAggregate, SentimentHistoryPoint};

/// Overwrite (or create) the single current row for a ticker.
pub async fn upsert_aggregate(
    pool: &PgPool,
    ticker: &str,
    sentiment_score: f64,
    article_count: i32,
    updated_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stock_sentiment (ticker, sentiment_score, article_count, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (ticker)
        DO UPDATE SET
            sentiment_score = EXCLUDED.sentiment_score,
            article_count = EXCLUDED.article_count,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(ticker)
    .bind(sentiment_score)
    .bind(article_count)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append one history point. An existing `(ticker, recorded_at)` row is kept as-is.
///
/// Returns whether a row was inserted.
pub async fn insert_history(
    pool: &PgPool,
    ticker: &str,
    sentiment_score: f64,
    article_count: i32,
    recorded_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO sentiment_history (ticker, sentiment_score, article_count, recorded_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (ticker, recorded_at) DO NOTHING
        "#,
    )
    .bind(ticker)
    .bind(sentiment_score)
    .bind(article_count)
    .bind(recorded_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All current aggregates, most positive first.
pub async fn fetch_all_aggregates(pool: &PgPool) -> Result<Vec<SentimentAggregate>, sqlx::Error> {
    // `real` columns are widened so they decode as f64
    sqlx::query_as::<_, SentimentAggregate>(
        r#"
        SELECT ticker, sentiment_score::float8 AS sentiment_score, article_count, updated_at
        FROM stock_sentiment
        ORDER BY sentiment_score DESC, ticker ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn fetch_aggregate(
    pool: &PgPool,
    ticker: &str,
) -> Result<Option<SentimentAggregate>, sqlx::Error> {
    sqlx::query_as::<_, SentimentAggregate>(
        r#"
        SELECT ticker, sentiment_score::float8 AS sentiment_score, article_count, updated_at
        FROM stock_sentiment
        WHERE ticker = $1
        "#,
    )
    .bind(ticker)
    .fetch_optional(pool)
    .await
}

/// History for one ticker since `since`, oldest first.
pub async fn fetch_history(
    pool: &PgPool,
    ticker: &str,
    since: DateTime<Utc>,
) -> Result<Vec<SentimentHistoryPoint>, sqlx::Error> {
    sqlx::query_as::<_, SentimentHistoryPoint>(
        r#"
        SELECT ticker, sentiment_score::float8 AS sentiment_score, article_count, recorded_at
        FROM sentiment_history
        WHERE ticker = $1
          AND recorded_at >= $2
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(ticker)
    .bind(since)
    .fetch_all(pool)
    .await
}
