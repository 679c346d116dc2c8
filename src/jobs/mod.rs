//! Background Jobs Module
//!
//! Jobs here are driven by the job scheduler service and run independently
//! of API requests.
//!
//! # Available Jobs
//!
//! - `sentiment_update_job` - Fetches news, scores it and refreshes the
//!   per-ticker sentiment aggregate and history
//!
//! Jobs are idempotent per cycle and never abort on a single ticker's failure.

pub mod sentiment_update_job;
