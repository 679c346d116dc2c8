pub mod sentiment_queries;
