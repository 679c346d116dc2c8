mod app;
mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::external::newsapi::NewsApiProvider;
use crate::jobs::sentiment_update_job::SentimentUpdateJob;
use crate::logging::LoggingConfig;
use crate::services::job_scheduler_service::JobSchedulerService;
use crate::services::news_service::NewsService;
use crate::services::sentiment_scorer::SentimentScorer;
use crate::state::AppState;
use crate::store::{PgSentimentStore, SentimentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Missing configuration is the only condition that stops the process
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(classification = e.classification(), "❌ {}", e);
        e
    })?;

    tracing::info!(
        "📋 Tracking {} tickers, cycle every {} min",
        config.universe.len(),
        config.scheduler.interval.as_secs() / 60
    );

    // Lazy pool: an unreachable database is a per-ticker persistence failure, not a startup error
    let pool = PgPoolOptions::new()
        .max_connections(config.store.max_connections)
        .acquire_timeout(config.store.timeout)
        .connect_lazy(&config.store.database_url)
        .context("Invalid DATABASE_URL")?;
    let store: Arc<dyn SentimentStore> = Arc::new(PgSentimentStore::new(pool, config.store.timeout));

    let scorer = Arc::new(
        SentimentScorer::load(&config.model)
            .await
            .context("Failed to load sentiment model")?,
    );

    let provider = NewsApiProvider::new(&config.news).context("Failed to build news client")?;
    let news = Arc::new(NewsService::new(Arc::new(provider), &config.news));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("🛑 Shutdown signal received, finishing in-flight tickers...");
        shutdown_tx.send_replace(true);
    });

    let app = app::create_app(AppState { store: store.clone() });
    let listener = TcpListener::bind(config.api_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.api_addr))?;
    tracing::info!("🚀 Sentiment API running at http://{}/", config.api_addr);

    let mut api_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = api_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let job = SentimentUpdateJob::new(
        config.universe,
        news,
        scorer,
        store,
        config.scheduler.ticker_concurrency,
    );
    let scheduler = JobSchedulerService::new(Arc::new(job), config.scheduler.interval);
    scheduler.run(shutdown_rx).await;

    server.await?.context("API server failed")?;
    tracing::info!("👋 Bye");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Could not install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
