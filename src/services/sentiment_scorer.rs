use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use crate::config::{ModelBackend, ModelConfig};
use crate::errors::ModelError;
use crate::external::finbert::FinBertModel;
use crate::external::sentiment_model::SentimentModel;
use crate::models::SentimentSample;
use crate::services::lexicon_model::LexiconModel;

/// Scores article texts with the single model instance loaded at startup.
///
/// Shared across tickers and cycles behind an `Arc`; never rebuilt inside
/// the update loop.
pub struct SentimentScorer {
    model: Arc<dyn SentimentModel>,
    /// Present only for models whose inference path is not reentrant
    gate: Option<Semaphore>,
    batch_size: usize,
    call_timeout: Duration,
}

impl SentimentScorer {
    pub fn new(model: Arc<dyn SentimentModel>, batch_size: usize, call_timeout: Duration) -> Self {
        let gate = (!model.is_reentrant()).then(|| Semaphore::new(1));
        Self {
            model,
            gate,
            batch_size: batch_size.max(1),
            call_timeout,
        }
    }

    /// Load the configured backend once.
    pub async fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let model: Arc<dyn SentimentModel> = match config.backend {
            ModelBackend::FinBert => Arc::new(FinBertModel::load(config).await?),
            ModelBackend::Lexicon => match &config.lexicon_path {
                Some(path) => Arc::new(LexiconModel::from_file(path)?),
                None => Arc::new(LexiconModel::builtin()),
            },
        };

        info!("🧠 Sentiment model '{}' loaded", model.name());
        Ok(Self::new(model, config.batch_size, config.timeout))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Score texts; the output is aligned with the input.
    ///
    /// Blank texts score a neutral 0.0 without reaching the model.
    pub async fn score(&self, texts: &[String]) -> Result<Vec<SentimentSample>, ModelError> {
        let mut samples = vec![0.0; texts.len()];

        let pending: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, t.trim().to_string()))
            .collect();

        debug!(
            "Scoring {} texts ({} blank) with {}",
            texts.len(),
            texts.len() - pending.len(),
            self.model.name()
        );

        for chunk in pending.chunks(self.batch_size) {
            let batch: Vec<String> = chunk.iter().map(|(_, t)| t.clone()).collect();
            let predictions = self.predict_batch(&batch).await?;

            if predictions.len() != batch.len() {
                return Err(ModelError::InvalidOutput(format!(
                    "model returned {} scores for {} texts",
                    predictions.len(),
                    batch.len()
                )));
            }

            for ((index, _), value) in chunk.iter().zip(predictions) {
                if !value.is_finite() {
                    return Err(ModelError::InvalidOutput(format!("non-finite score {}", value)));
                }
                samples[*index] = value.clamp(-1.0, 1.0);
            }
        }

        Ok(samples)
    }

    async fn predict_batch(&self, batch: &[String]) -> Result<Vec<f64>, ModelError> {
        let _permit = match &self.gate {
            Some(gate) => Some(
                gate.acquire()
                    .await
                    .map_err(|e| ModelError::Load(e.to_string()))?,
            ),
            None => None,
        };

        timeout(self.call_timeout, self.model.predict(batch))
            .await
            .map_err(|_| ModelError::Timeout)?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed score per exact text; unknown text scores 0.
    #[derive(Default)]
    pub(crate) struct FixedScoreModel {
        scores: HashMap<String, f64>,
        pub batches: Mutex<Vec<usize>>,
        pub fail: bool,
        pub reentrant: bool,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FixedScoreModel {
        pub fn with_scores(scores: &[(&str, f64)]) -> Self {
            Self {
                scores: scores.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
                reentrant: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SentimentModel for FixedScoreModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn is_reentrant(&self) -> bool {
            self.reentrant
        }

        async fn predict(&self, texts: &[String]) -> Result<Vec<f64>, ModelError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.batches.lock().push(texts.len());
            if self.fail {
                return Err(ModelError::InvalidOutput("tensor shape mismatch".to_string()));
            }
            Ok(texts
                .iter()
                .map(|t| self.scores.get(t).copied().unwrap_or(0.0))
                .collect())
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_output_aligned_with_input_and_blanks_neutral() {
        let model = Arc::new(FixedScoreModel::with_scores(&[("good", 0.8), ("bad", -0.6)]));
        let scorer = SentimentScorer::new(model.clone(), 16, Duration::from_secs(5));

        let samples = scorer.score(&texts(&["good", "   ", "bad", ""])).await.unwrap();

        assert_eq!(samples, vec![0.8, 0.0, -0.6, 0.0]);
        assert_eq!(*model.batches.lock(), vec![2], "blank texts never reach the model");
    }

    #[tokio::test]
    async fn test_all_blank_skips_model() {
        let model = Arc::new(FixedScoreModel::with_scores(&[]));
        let scorer = SentimentScorer::new(model.clone(), 16, Duration::from_secs(5));

        assert_eq!(scorer.score(&texts(&["", " \t"])).await.unwrap(), vec![0.0, 0.0]);
        assert!(model.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_batches_respect_batch_size() {
        let model = Arc::new(FixedScoreModel::with_scores(&[]));
        let scorer = SentimentScorer::new(model.clone(), 2, Duration::from_secs(5));

        let samples = scorer.score(&texts(&["a", "b", "c", "d", "e"])).await.unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(*model.batches.lock(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_out_of_range_scores_are_clamped() {
        let model = Arc::new(FixedScoreModel::with_scores(&[("euphoric", 1.7), ("doom", -3.0)]));
        let scorer = SentimentScorer::new(model, 16, Duration::from_secs(5));

        assert_eq!(scorer.score(&texts(&["euphoric", "doom"])).await.unwrap(), vec![1.0, -1.0]);
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let model = Arc::new(FixedScoreModel {
            fail: true,
            ..FixedScoreModel::with_scores(&[])
        });
        let scorer = SentimentScorer::new(model, 16, Duration::from_secs(5));

        assert!(matches!(
            scorer.score(&texts(&["anything"])).await,
            Err(ModelError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_same_text_scores_identically() {
        let scorer = SentimentScorer::new(Arc::new(LexiconModel::builtin()), 16, Duration::from_secs(5));
        let input = texts(&["Apple beats estimates but warns on China weakness"]);

        let first = scorer.score(&input).await.unwrap();
        let second = scorer.score(&input).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_non_reentrant_model_is_serialized() {
        let model = Arc::new(FixedScoreModel {
            reentrant: false,
            ..FixedScoreModel::with_scores(&[])
        });
        let scorer = Arc::new(SentimentScorer::new(model.clone(), 1, Duration::from_secs(5)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scorer = scorer.clone();
                tokio::spawn(async move { scorer.score(&texts(&["x", "y"])).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(model.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_fails_on_unreadable_lexicon() {
        let config = ModelConfig {
            backend: ModelBackend::Lexicon,
            endpoint: String::new(),
            api_token: None,
            lexicon_path: Some(std::path::PathBuf::from("/nonexistent/lexicon.json")),
            batch_size: 16,
            timeout: Duration::from_secs(5),
        };

        let err = SentimentScorer::load(&config).await.err().unwrap();
        assert!(matches!(err, ModelError::Load(ref msg) if msg.contains("lexicon.json")));
    }

    #[tokio::test]
    async fn test_load_builtin_lexicon() {
        let config = ModelConfig {
            backend: ModelBackend::Lexicon,
            endpoint: String::new(),
            api_token: None,
            lexicon_path: None,
            batch_size: 16,
            timeout: Duration::from_secs(5),
        };

        let scorer = SentimentScorer::load(&config).await.unwrap();
        assert_eq!(scorer.model_name(), "lexicon");
    }
}
