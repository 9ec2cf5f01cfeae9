//! Threshold + top-k selection over raw scorer output.
//!
//! The scorer makes no ordering promise; this stage ranks, filters and
//! truncates so every caller sees the same tag list for the same scores.

use crate::error::ConfigError;
use crate::types::{ExtractionResult, ScoredLabel};

/// Caller-supplied extraction policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    top_k: usize,
    min_confidence: f32,
}

impl ExtractOptions {
    /// Validate and build extraction options.
    ///
    /// `top_k` must be at least 1 and `min_confidence` must lie in `[0, 1]`.
    pub fn new(top_k: usize, min_confidence: f32) -> Result<Self, ConfigError> {
        if top_k == 0 {
            return Err(ConfigError::ValidationError("top_k must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ConfigError::ValidationError(format!(
                "min_conf must be between 0.0 and 1.0, got {min_confidence}"
            )));
        }
        Ok(Self {
            top_k,
            min_confidence,
        })
    }

    /// Maximum number of tags returned.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Confidence floor (inclusive).
    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }
}

/// Rank scored labels and keep the best `top_k` at or above `min_confidence`.
///
/// An empty result is a valid "no tags detected" outcome, not an error.
/// NaN confidences never pass the threshold.
pub fn extract(scores: &[ScoredLabel], options: &ExtractOptions) -> ExtractionResult {
    let mut kept: Vec<ScoredLabel> = scores
        .iter()
        .filter(|s| s.confidence >= options.min_confidence)
        .cloned()
        .collect();

    // `sort_by` is stable, so equal confidences keep scorer order.
    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    kept.truncate(options.top_k);

    ExtractionResult::from_ranked(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(top_k: usize, min_conf: f32) -> ExtractOptions {
        ExtractOptions::new(top_k, min_conf).unwrap()
    }

    fn scores(pairs: &[(&str, f32)]) -> Vec<ScoredLabel> {
        pairs.iter().map(|(l, c)| ScoredLabel::new(*l, *c)).collect()
    }

    #[test]
    fn test_threshold_and_top_k() {
        let s = scores(&[("sky", 0.9), ("sea", 0.3), ("forest", 0.05)]);
        let result = extract(&s, &opts(2, 0.2));
        assert_eq!(result.to_labels(), vec!["sky", "sea"]);
    }

    #[test]
    fn test_all_below_threshold_is_empty() {
        let s = scores(&[("sky", 0.1), ("sea", 0.05)]);
        let result = extract(&s, &opts(5, 0.2));
        assert!(result.is_empty());
    }

    #[test]
    fn test_unsorted_input_is_ranked() {
        let s = scores(&[("lake", 0.4), ("sun", 0.8), ("city", 0.6)]);
        let result = extract(&s, &opts(3, 0.0));
        assert_eq!(result.to_labels(), vec!["sun", "city", "lake"]);
    }

    #[test]
    fn test_ties_keep_scorer_order() {
        let s = scores(&[("river", 0.5), ("street", 0.7), ("beach", 0.5), ("night", 0.5)]);
        let result = extract(&s, &opts(4, 0.0));
        assert_eq!(result.to_labels(), vec!["street", "river", "beach", "night"]);
    }

    #[test]
    fn test_top_k_larger_than_available() {
        let s = scores(&[("sky", 0.9), ("sea", 0.3)]);
        let result = extract(&s, &opts(16, 0.0));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let s = scores(&[("sky", 0.25)]);
        assert_eq!(extract(&s, &opts(1, 0.25)).len(), 1);
    }

    #[test]
    fn test_nan_never_passes() {
        let s = scores(&[("sky", f32::NAN), ("sea", 0.4)]);
        let result = extract(&s, &opts(5, 0.0));
        assert_eq!(result.to_labels(), vec!["sea"]);
    }

    #[test]
    fn test_output_non_increasing_and_bounded() {
        let s: Vec<ScoredLabel> = (0..40)
            .map(|i| ScoredLabel::new(format!("t{i}"), ((i * 37) % 101) as f32 / 100.0))
            .collect();
        for top_k in 1..10 {
            for step in 0..=10 {
                let min_conf = step as f32 / 10.0;
                let result = extract(&s, &opts(top_k, min_conf));
                assert!(result.len() <= top_k);
                assert!(result.tags().iter().all(|t| t.confidence >= min_conf));
                assert!(result
                    .tags()
                    .windows(2)
                    .all(|w| w[0].confidence >= w[1].confidence));
            }
        }
    }

    #[test]
    fn test_raising_threshold_never_grows_result() {
        let s: Vec<ScoredLabel> = (0..25)
            .map(|i| ScoredLabel::new(format!("t{i}"), ((i * 13) % 29) as f32 / 28.0))
            .collect();
        let mut previous = usize::MAX;
        for step in 0..=20 {
            let len = extract(&s, &opts(25, step as f32 / 20.0)).len();
            assert!(len <= previous);
            previous = len;
        }
    }

    #[test]
    fn test_options_validation() {
        assert!(ExtractOptions::new(0, 0.5).is_err());
        assert!(ExtractOptions::new(3, 1.2).is_err());
        assert!(ExtractOptions::new(3, -0.1).is_err());
        assert!(ExtractOptions::new(3, f32::NAN).is_err());
        let ok = ExtractOptions::new(3, 0.0).unwrap();
        assert_eq!(ok.top_k(), 3);
    }
}
