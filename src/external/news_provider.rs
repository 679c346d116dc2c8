use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::NewsError;
use crate::models::Article;

/// Parameters of one provider search.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub query: String,
    /// Articles published before this instant are dropped.
    pub published_after: DateTime<Utc>,
    pub page_size: usize,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run one search. A successful search with no hits returns `Ok(vec![])`.
    async fn search(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsError>;
}
