use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ModelConfig;
use crate::errors::ModelError;
use crate::external::sentiment_model::SentimentModel;

/// FinBERT accepts 512 tokens; headlines plus descriptions rarely get close,
/// but clip long bodies before they reach the host.
const MAX_INPUT_CHARS: usize = 2_000;

/// ProsusAI/FinBERT served by a Hugging Face compatible inference endpoint.
///
/// Each text is scored as `P(positive) - P(negative)`.
pub struct FinBertModel {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: Vec<&'a str>,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    top_k: usize,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<Vec<LabelScore>>),
    Single(Vec<LabelScore>),
    Error { error: String },
}

impl FinBertModel {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Load(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Build the client and ask the host to bring the model up.
    ///
    /// A failed warm-up is logged, not returned: the host may still be
    /// provisioning and every cycle tolerates inference failures.
    pub async fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let model = Self::new(config)?;
        info!("🧠 Loading FinBERT from {}", model.endpoint);

        match model.predict(&["Markets opened flat this morning.".to_string()]).await {
            Ok(_) => info!("✅ FinBERT ready"),
            Err(e) => warn!("FinBERT warm-up failed, continuing: {}", e),
        }

        Ok(model)
    }
}

#[async_trait]
impl SentimentModel for FinBertModel {
    fn name(&self) -> &str {
        "finbert"
    }

    async fn predict(&self, texts: &[String]) -> Result<Vec<f64>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = InferenceRequest {
            inputs: texts.iter().map(|t| clip(t, MAX_INPUT_CHARS)).collect(),
            parameters: InferenceParameters { top_k: 3 },
            options: InferenceOptions { wait_for_model: true },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout
            } else {
                ModelError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        parse_response(status, &body, texts.len())
    }
}

fn parse_response(status: StatusCode, body: &str, expected: usize) -> Result<Vec<f64>, ModelError> {
    if !status.is_success() {
        return Err(ModelError::Api {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    let parsed: InferenceResponse =
        serde_json::from_str(body).map_err(|e| ModelError::InvalidOutput(e.to_string()))?;

    let rows = match parsed {
        InferenceResponse::Batch(rows) => rows,
        InferenceResponse::Single(row) if expected == 1 => vec![row],
        InferenceResponse::Single(_) => {
            return Err(ModelError::InvalidOutput(
                "flat label list returned for a multi-text batch".to_string(),
            ))
        }
        InferenceResponse::Error { error } => return Err(ModelError::InvalidOutput(error)),
    };

    if rows.len() != expected {
        return Err(ModelError::InvalidOutput(format!(
            "expected {} predictions, got {}",
            expected,
            rows.len()
        )));
    }

    rows.iter().map(|labels| polarity(labels)).collect()
}

fn polarity(labels: &[LabelScore]) -> Result<f64, ModelError> {
    let mut positive = 0.0;
    let mut negative = 0.0;
    let mut known = false;

    for l in labels {
        match l.label.to_lowercase().as_str() {
            "positive" => {
                positive = l.score;
                known = true;
            }
            "negative" => {
                negative = l.score;
                known = true;
            }
            "neutral" => known = true,
            _ => {}
        }
    }

    if !known {
        return Err(ModelError::InvalidOutput(format!(
            "no sentiment labels in {:?}",
            labels.iter().map(|l| l.label.as_str()).collect::<Vec<_>>()
        )));
    }

    Ok(positive - negative)
}

fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
