use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::errors::ModelError;
use crate::external::sentiment_model::SentimentModel;

/// Words that flip the polarity of sentiment terms shortly after them
const NEGATORS: &[&str] = &["not", "no", "never", "without", "neither", "nor", "hardly"];
const NEGATION_WINDOW: usize = 3;

/// Smoothing constant: a single hit scores ±0.5, more hits approach ±1.
const SMOOTHING: f64 = 1.0;

const POSITIVE_TERMS: &[&str] = &[
    "beat", "beats", "exceeded", "exceeds", "outperform", "outperforms", "outperformed",
    "upgrade", "upgraded", "upgrades", "surge", "surges", "surged", "soar", "soars", "soared",
    "rally", "rallies", "rallied", "gain", "gains", "gained", "record", "growth", "grew",
    "profit", "profitable", "profits", "strong", "stronger", "strength", "bullish", "boost",
    "boosted", "boosts", "improve", "improved", "improves", "improvement", "raise", "raised",
    "raises", "buyback", "dividend", "expand", "expands", "expansion", "win", "wins", "won",
    "breakthrough", "approval", "approved", "rebound", "rebounds", "rebounded", "jump",
    "jumps", "jumped", "optimistic", "optimism", "robust", "momentum", "innovative",
    "partnership", "accelerate", "accelerates", "tops", "topped", "upbeat",
];

const NEGATIVE_TERMS: &[&str] = &[
    "miss", "misses", "missed", "downgrade", "downgraded", "downgrades", "plunge", "plunges",
    "plunged", "slump", "slumps", "slumped", "fall", "falls", "fell", "drop", "drops",
    "dropped", "decline", "declines", "declined", "loss", "losses", "weak", "weaker",
    "weakness", "bearish", "lawsuit", "sued", "probe", "investigation", "recall", "recalls",
    "layoff", "layoffs", "cut", "cuts", "slash", "slashes", "slashed", "warning", "warns",
    "warned", "default", "bankruptcy", "fraud", "fine", "fined", "penalty", "delay",
    "delayed", "delays", "concern", "concerns", "risk", "risks", "tumble", "tumbles",
    "tumbled", "sink", "sinks", "sank", "crash", "crashes", "crashed", "disappointing",
    "disappoints", "pessimistic", "headwinds", "shortfall", "halt", "halted",
];

#[derive(Debug, Deserialize)]
struct LexiconFile {
    positive: Vec<String>,
    negative: Vec<String>,
}

/// Deterministic dictionary model for financial headlines.
///
/// Cheaper and far less nuanced than FinBERT; used when no model host is
/// available and as the reference model in tests.
#[derive(Debug, Clone)]
pub struct LexiconModel {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl LexiconModel {
    pub fn builtin() -> Self {
        Self::from_terms(
            POSITIVE_TERMS.iter().map(|t| t.to_string()),
            NEGATIVE_TERMS.iter().map(|t| t.to_string()),
        )
    }

    /// Load `{ "positive": [...], "negative": [...] }` from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))?;
        let file: LexiconFile = serde_json::from_str(&raw)
            .map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))?;

        if file.positive.is_empty() || file.negative.is_empty() {
            return Err(ModelError::Load(format!(
                "{}: both positive and negative term lists must be non-empty",
                path.display()
            )));
        }

        let model = Self::from_terms(file.positive, file.negative);
        info!(
            "📖 Loaded lexicon from {} ({} positive, {} negative terms)",
            path.display(),
            model.positive.len(),
            model.negative.len()
        );
        Ok(model)
    }

    fn from_terms(
        positive: impl IntoIterator<Item = String>,
        negative: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            positive: positive.into_iter().map(|t| t.to_lowercase()).collect(),
            negative: negative.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn score_text(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .map(|t| t.trim_matches('\''))
            .filter(|t| !t.is_empty());

        let mut positive = 0u32;
        let mut negative = 0u32;
        let mut negate_for = 0usize;

        for token in tokens {
            if NEGATORS.contains(&token) || token.ends_with("n't") {
                negate_for = NEGATION_WINDOW;
                continue;
            }

            let polarity = if self.positive.contains(token) {
                1
            } else if self.negative.contains(token) {
                -1
            } else {
                0
            };

            let polarity = if negate_for > 0 { -polarity } else { polarity };
            match polarity {
                1 => positive += 1,
                -1 => negative += 1,
                _ => {}
            }

            negate_for = negate_for.saturating_sub(1);
        }

        let (pos, neg) = (positive as f64, negative as f64);
        (pos - neg) / (pos + neg + SMOOTHING)
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn predict(&self, texts: &[String]) -> Result<Vec<f64>, ModelError> {
        Ok(texts.iter().map(|t| self.score_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_direction() {
        let model = LexiconModel::builtin();

        assert!(model.score_text("Apple beats estimates as iPhone sales surge") > 0.0);
        assert!(model.score_text("Tesla shares plunge after recall and lawsuit") < 0.0);
        assert_eq!(model.score_text("Company to hold annual meeting on Tuesday"), 0.0);
    }

    #[test]
    fn test_more_positive_phrasing_scores_higher() {
        let model = LexiconModel::builtin();

        let mild = model.score_text("Nvidia posts growth");
        let strong = model.score_text("Nvidia posts record growth, beats estimates and raises guidance");
        assert!(strong > mild);
    }

    #[test]
    fn test_negation_flips() {
        let model = LexiconModel::builtin();

        assert!(model.score_text("Results were not strong") < 0.0);
        assert!(model.score_text("Regulators didn't find fraud") > 0.0);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let model = LexiconModel::builtin();
        let text = "surge ".repeat(500);
        let score = model.score_text(&text);
        assert!(score > 0.99 && score < 1.0);
    }

    #[test]
    fn test_from_file_rejects_missing_path() {
        let err = LexiconModel::from_file(Path::new("/nonexistent/lexicon.json")).unwrap_err();
        assert!(matches!(err, ModelError::Load(_)));
    }

    #[test]
    fn test_from_file_loads_custom_terms() {
        let path = std::env::temp_dir().join(format!("lexicon-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"positive": ["Moon"], "negative": ["Rug"]}"#).unwrap();

        let model = LexiconModel::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(model.score_text("to the moon") > 0.0);
        assert!(model.score_text("rug pulled") < 0.0);
        assert_eq!(model.score_text("beats estimates"), 0.0);
    }
}
