use async_trait::async_trait;

use crate::errors::ModelError;

/// A financial-text sentiment classifier.
///
/// Implementations are built once at startup and shared for the lifetime
/// of the process.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `predict` may be called concurrently. Non-reentrant models
    /// are serialized by the scorer.
    fn is_reentrant(&self) -> bool {
        true
    }

    /// Score non-blank texts, one signed value per input in input order.
    async fn predict(&self, texts: &[String]) -> Result<Vec<f64>, ModelError>;
}
