use crate::models::SentimentSample;

/// Decimal places kept for stored scores
pub const SCORE_PRECISION: i32 = 4;

/// Ticker-level reduction of per-article samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub sentiment_score: f64,
    pub article_count: i32,
}

/// Mean of the samples at fixed precision.
///
/// Returns `None` for an empty input: there is no score to store and the
/// caller must leave the previous aggregate untouched. The rounded mean is
/// kept inside `[min, max]` of the samples so rounding can never report a
/// value no article produced.
pub fn aggregate(samples: &[SentimentSample]) -> Option<Aggregate> {
    if samples.is_empty() {
        return None;
    }

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;

    let sentiment_score = round_to(mean, SCORE_PRECISION).clamp(min, max).clamp(-1.0, 1.0);

    Some(Aggregate {
        sentiment_score,
        article_count: samples.len() as i32,
    })
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_score() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn test_mean_rounded_to_four_places() {
        let result = aggregate(&[0.5, -0.1, 0.3]).unwrap();
        assert_eq!(result.article_count, 3);
        assert_eq!(result.sentiment_score, 0.2333);
    }

    #[test]
    fn test_single_sample() {
        let result = aggregate(&[-0.87]).unwrap();
        assert_eq!(result.sentiment_score, -0.87);
        assert_eq!(result.article_count, 1);
    }

    #[test]
    fn test_rounding_never_leaves_sample_range() {
        // Mean 0.12345 would round up to 0.1235, above every sample
        let result = aggregate(&[0.12345, 0.12345]).unwrap();
        assert!(result.sentiment_score <= 0.12345);
        assert!(result.sentiment_score >= 0.12345);
    }

    #[test]
    fn test_score_within_min_max_and_unit_range() {
        let cases: &[&[f64]] = &[
            &[1.0, 1.0, 1.0],
            &[-1.0, -0.99999],
            &[0.0, 0.0, 0.0, 0.0],
            &[0.91, -0.33, 0.05, 0.4, -0.77],
            &[0.33333, 0.33334, 0.33335],
        ];

        for samples in cases {
            let result = aggregate(samples).unwrap();
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            assert!(result.sentiment_score >= min && result.sentiment_score <= max, "{:?}", samples);
            assert!((-1.0..=1.0).contains(&result.sentiment_score));
            assert_eq!(result.article_count as usize, samples.len());
        }
    }
}
