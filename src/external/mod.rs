pub mod finbert;
pub mod news_provider;
pub mod newsapi;
pub mod sentiment_model;
