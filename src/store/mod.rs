pub mod sentiment_store;

pub use sentiment_store::{PgSentimentStore, SentimentStore};
