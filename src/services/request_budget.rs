use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

use crate::errors::NewsError;

/// Process-wide request budget for the news provider.
///
/// Two limits are enforced:
/// 1. A hard daily cap (the provider quota). Every attempted call is counted,
///    whether it later succeeds or not. The count resets at UTC midnight.
/// 2. A minimum spacing between consecutive calls, so a burst of tickers
///    does not trip the provider's short-window limiter.
pub struct RequestBudget {
    daily_limit: u32,
    state: Mutex<BudgetState>,
    /// Earliest instant the next request may be sent
    next_slot: Mutex<Instant>,
    min_delay: Duration,
}

#[derive(Debug)]
struct BudgetState {
    day: NaiveDate,
    used: u32,
    /// Set when the provider reported its daily quota as spent.
    exhausted: bool,
}

impl BudgetState {
    fn roll_over(&mut self, today: NaiveDate) {
        if today != self.day {
            self.day = today;
            self.used = 0;
            self.exhausted = false;
        }
    }
}

impl RequestBudget {
    /// # Arguments
    /// * `daily_limit` - Maximum outbound requests per UTC day (NewsAPI free tier: 100)
    /// * `requests_per_minute` - Maximum request rate used for spacing calls
    pub fn new(daily_limit: u32, requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / requests_per_minute.max(1) as u64;
        Self {
            daily_limit,
            state: Mutex::new(BudgetState {
                day: Utc::now().date_naive(),
                used: 0,
                exhausted: false,
            }),
            next_slot: Mutex::new(Instant::now()),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Reserve one request from today's budget.
    ///
    /// Returns the number of requests still available after this one.
    pub fn try_acquire(&self) -> Result<u32, NewsError> {
        self.try_acquire_on(Utc::now().date_naive())
    }

    pub fn try_acquire_on(&self, today: NaiveDate) -> Result<u32, NewsError> {
        let mut state = self.state.lock();
        state.roll_over(today);

        if state.exhausted || state.used >= self.daily_limit {
            return Err(NewsError::RateLimited);
        }

        state.used += 1;
        Ok(self.daily_limit - state.used)
    }

    /// Treat the rest of the day as spent after the provider reported its quota gone.
    pub fn mark_exhausted(&self) {
        self.mark_exhausted_on(Utc::now().date_naive());
    }

    pub fn mark_exhausted_on(&self, today: NaiveDate) {
        let mut state = self.state.lock();
        state.roll_over(today);
        state.exhausted = true;
    }

    pub fn remaining_on(&self, today: NaiveDate) -> u32 {
        let mut state = self.state.lock();
        state.roll_over(today);
        if state.exhausted {
            0
        } else {
            self.daily_limit.saturating_sub(state.used)
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_on(Utc::now().date_naive())
    }

    /// Wait until the minimum spacing since the previously reserved slot has elapsed.
    pub async fn pace(&self) {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.min_delay;
            slot
        }; // Lock is dropped here

        sleep_until(slot).await;
    }
}
