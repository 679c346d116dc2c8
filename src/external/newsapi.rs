use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::NewsConfig;
use crate::errors::NewsError;
use crate::external::news_provider::{NewsProvider, NewsQuery};
use crate::models::Article;

/// NewsAPI.org `/v2/everything` client
pub struct NewsApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsApiProvider {
    pub fn new(config: &NewsConfig) -> Result<Self, NewsError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sentiment-pulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NewsError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    url: Option<String>,
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

// NewsAPI keeps deleted articles in results with this placeholder text
const REMOVED_PLACEHOLDER: &str = "[Removed]";

#[async_trait]
impl NewsProvider for NewsApiProvider {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    async fn search(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsError> {
        let url = format!("{}/everything", self.base_url);
        let from = query.published_after.format("%Y-%m-%dT%H:%M:%S").to_string();
        let page_size = query.page_size.min(100).to_string();

        debug!("Querying NewsAPI: q={} from={}", query.query, from);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query.query.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("from", from.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NewsError::Timeout
                } else {
                    NewsError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NewsError::Network(e.to_string()))?;

        parse_response(status, &body, query)
    }
}

fn parse_response(status: StatusCode, body: &str, query: &NewsQuery) -> Result<Vec<Article>, NewsError> {
    let parsed: NewsApiResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if status == StatusCode::TOO_MANY_REQUESTS => return Err(NewsError::RateLimited),
        Err(e) if status.is_success() => return Err(NewsError::Parse(e.to_string())),
        Err(_) => {
            return Err(NewsError::BadResponse(format!(
                "HTTP {}: {}",
                status,
                truncate(body, 200)
            )))
        }
    };

    if parsed.status != "ok" {
        let code = parsed.code.unwrap_or_default();
        match code.as_str() {
            // Daily cap: nothing else will succeed until UTC midnight
            "apiKeyExhausted" => return Err(NewsError::QuotaExhausted),
            "rateLimited" => return Err(NewsError::RateLimited),
            _ if status == StatusCode::TOO_MANY_REQUESTS => return Err(NewsError::RateLimited),
            _ => {}
        }
        return Err(NewsError::BadResponse(format!(
            "HTTP {} {}: {}",
            status,
            code,
            parsed.message.unwrap_or_default()
        )));
    }

    let articles = parsed
        .articles
        .into_iter()
        .filter_map(|item| {
            let published_at = match item.published_at.as_deref().map(DateTime::parse_from_rfc3339) {
                Some(Ok(ts)) => ts.with_timezone(&Utc),
                _ => {
                    warn!("Dropping article with unparseable publish time: {:?}", item.published_at);
                    return None;
                }
            };

            if published_at < query.published_after {
                return None;
            }

            let headline = item.title.filter(|t| t != REMOVED_PLACEHOLDER);
            let description = item.description.filter(|d| d != REMOVED_PLACEHOLDER);
            if headline.is_none() && description.is_none() {
                return None;
            }

            Some(Article {
                headline,
                description,
                published_at,
                source: item.source.and_then(|s| s.name),
                url: item.url,
            })
        })
        .take(query.page_size)
        .collect();

    Ok(articles)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
