use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

use crate::models::CycleReport;

/// Anything that can run one full update cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self, cycle: u64, shutdown: &watch::Receiver<bool>) -> CycleReport;
}

/// Fixed-interval scheduler. Cycle starts are `interval` apart unless a
/// cycle overruns, in which case the next one starts right away. Cycles
/// never overlap.
pub struct JobSchedulerService {
    runner: Arc<dyn CycleRunner>,
    interval: Duration,
}

impl JobSchedulerService {
    pub fn new(runner: Arc<dyn CycleRunner>, interval: Duration) -> Self {
        Self { runner, interval }
    }

    /// Run cycles until shutdown is requested. Returns the number of cycles run.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(
            "🚀 Starting sentiment scheduler (every {} min)",
            self.interval.as_secs() / 60
        );

        let mut cycle = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            cycle += 1;
            info!("🏃 Starting cycle #{}", cycle);
            let started = Instant::now();

            let report = self.runner.run_cycle(cycle, &shutdown).await;
            let elapsed = started.elapsed();
            log_report(&report, elapsed);

            if *shutdown.borrow() {
                break;
            }

            let wait = self.interval.saturating_sub(elapsed);
            if wait.is_zero() {
                warn!(
                    "⚠️ Cycle #{} took {:.1}s, longer than the {}s interval; starting next cycle now",
                    cycle,
                    elapsed.as_secs_f64(),
                    self.interval.as_secs()
                );
            } else {
                info!("⏳ Next cycle in {:.0}s", wait.as_secs_f64());
            }

            tokio::select! {
                _ = sleep(wait) => {}
                changed = shutdown.changed() => {
                    // A dropped sender can never signal again, so stop either way
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("🛑 Scheduler stopped after {} cycles", cycle);
        cycle
    }
}

fn log_report(report: &CycleReport, elapsed: Duration) {
    info!(
        cycle = report.cycle,
        updated = report.updated,
        no_articles = report.no_articles,
        rate_limited = report.rate_limited,
        unavailable = report.unavailable,
        inference_failures = report.inference_failures,
        persistence_failures = report.persistence_failures,
        not_started = report.not_started,
        "✅ Cycle #{} complete in {:.1}s: {} updated, {} without news, {} skipped",
        report.cycle,
        elapsed.as_secs_f64(),
        report.updated,
        report.no_articles,
        report.skipped()
    );
}
