pub mod aggregator;
pub mod job_scheduler_service;
pub mod lexicon_model;
pub mod news_service;
pub mod request_budget;
pub mod sentiment_scorer;
