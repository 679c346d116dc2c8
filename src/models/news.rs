use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single news article retrieved for one ticker during one cycle.
///
/// Articles are never persisted; only the sentiment derived from them is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub headline: Option<String>,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: Option<String>,
    pub url: Option<String>,
}

impl Article {
    /// Text handed to the sentiment model: headline and description joined by a space.
    pub fn scoring_text(&self) -> String {
        let headline = self.headline.as_deref().unwrap_or("").trim();
        let description = self.description.as_deref().unwrap_or("").trim();

        match (headline.is_empty(), description.is_empty()) {
            (false, false) => format!("{} {}", headline, description),
            (false, true) => headline.to_string(),
            (true, false) => description.to_string(),
            (true, true) => String::new(),
        }
    }
}
