//! Per-session match state.
//!
//! Each user session owns one `MatchSession`; nothing here is shared between
//! sessions, so one session's selection never leaks into another's.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::PipelineError;
use crate::index::TagIndex;
use crate::types::{ExtractionResult, MatchOutcome};

use super::engine::{compute_pool, explain, select_with_rng};
use super::state::MatchState;

/// Threads `MatchState` through repeated evaluations for one session.
#[derive(Debug)]
pub struct MatchSession {
    state: Option<MatchState>,
    rng: StdRng,
}

impl Default for MatchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchSession {
    /// Start a session with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self {
            state: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Start a session with a fixed seed (reproducible draws).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current state; `None` before the first evaluation.
    pub fn state(&self) -> Option<&MatchState> {
        self.state.as_ref()
    }

    /// Forget the current selection.
    pub fn clear(&mut self) {
        self.state = None;
    }

    /// Run pool → select → explain for one interaction and keep the new state.
    ///
    /// Re-evaluating the same extraction without `force_reset` returns the
    /// same selection.
    pub fn evaluate(
        &mut self,
        extracted: &ExtractionResult,
        index: &TagIndex,
        force_reset: bool,
    ) -> Result<MatchOutcome, PipelineError> {
        if extracted.is_empty() {
            self.state = Some(MatchState::NoPool);
            return Ok(MatchOutcome::NoTags);
        }

        let pool = compute_pool(extracted, index);
        let next = select_with_rng(&pool, self.state.as_ref(), force_reset, &mut self.rng);

        let outcome = match next.selected() {
            None => MatchOutcome::NoMatches {
                tags: extracted.to_labels(),
            },
            Some(selected) => MatchOutcome::Matched {
                tags: extracted.to_labels(),
                selected: selected.to_string(),
                pool_size: pool.len(),
                matched_tags: explain(selected, extracted, index)?,
            },
        };

        self.state = Some(next);
        Ok(outcome)
    }

    /// Redraw from the current pool ("reset random match").
    ///
    /// Equivalent to `evaluate` with `force_reset = true`.
    pub fn reset(
        &mut self,
        extracted: &ExtractionResult,
        index: &TagIndex,
    ) -> Result<MatchOutcome, PipelineError> {
        self.evaluate(extracted, index, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexRow;
    use crate::tagging::{extract, ExtractOptions};
    use crate::types::ScoredLabel;

    fn index() -> TagIndex {
        TagIndex::build(vec![
            IndexRow::new(2, "a.png", "sky;sea"),
            IndexRow::new(3, "b.png", "sky;forest"),
            IndexRow::new(4, "c.png", "sky"),
            IndexRow::new(5, "d.png", "night"),
        ])
        .unwrap()
    }

    fn tags(pairs: &[(&str, f32)]) -> ExtractionResult {
        let scores: Vec<ScoredLabel> = pairs.iter().map(|(l, c)| ScoredLabel::new(*l, *c)).collect();
        extract(&scores, &ExtractOptions::new(5, 0.2).unwrap())
    }

    #[test]
    fn test_no_tags_and_no_matches_are_distinct() {
        let idx = index();
        let mut session = MatchSession::with_seed(1);

        let outcome = session.evaluate(&tags(&[("sky", 0.1)]), &idx, false).unwrap();
        assert_eq!(outcome, MatchOutcome::NoTags);

        let outcome = session.evaluate(&tags(&[("lake", 0.9)]), &idx, false).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::NoMatches {
                tags: vec!["lake".to_string()]
            }
        );
        assert_eq!(session.state(), Some(&MatchState::NoPool));
    }

    #[test]
    fn test_repeated_evaluation_is_sticky() {
        let idx = index();
        let extracted = tags(&[("sky", 0.9), ("sea", 0.4)]);
        let mut session = MatchSession::with_seed(3);

        let first = session.evaluate(&extracted, &idx, false).unwrap();
        for _ in 0..20 {
            let again = session.evaluate(&extracted, &idx, false).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_matched_outcome_explains_selection() {
        let idx = index();
        let extracted = tags(&[("forest", 0.9), ("sky", 0.5)]);
        let mut session = MatchSession::with_seed(9);

        match session.evaluate(&extracted, &idx, false).unwrap() {
            MatchOutcome::Matched {
                selected,
                pool_size,
                matched_tags,
                tags,
            } => {
                assert_eq!(pool_size, 3);
                assert_eq!(tags, vec!["forest", "sky"]);
                assert!(!matched_tags.is_empty());
                let expected: Vec<String> = tags
                    .iter()
                    .filter(|t| idx.tags_of(&selected).unwrap().contains(*t))
                    .cloned()
                    .collect();
                assert_eq!(matched_tags, expected);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_stays_within_pool() {
        let idx = index();
        let extracted = tags(&[("sky", 0.9)]);
        let mut session = MatchSession::with_seed(5);
        session.evaluate(&extracted, &idx, false).unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let outcome = session.reset(&extracted, &idx).unwrap();
            seen.insert(outcome.selected().unwrap().to_string());
        }
        assert!(seen.iter().all(|id| ["a.png", "b.png", "c.png"].contains(&id.as_str())));
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let idx = index();
        let extracted = tags(&[("sky", 0.9)]);
        let mut one = MatchSession::with_seed(11);
        let mut two = MatchSession::with_seed(12);

        let first = one.evaluate(&extracted, &idx, false).unwrap();
        for _ in 0..10 {
            two.reset(&extracted, &idx).unwrap();
        }
        two.clear();
        assert!(two.state().is_none());

        assert_eq!(one.evaluate(&extracted, &idx, false).unwrap(), first);
    }

    #[test]
    fn test_new_pool_replaces_selection() {
        let idx = index();
        let mut session = MatchSession::with_seed(2);
        session.evaluate(&tags(&[("sky", 0.9)]), &idx, false).unwrap();

        let outcome = session.evaluate(&tags(&[("night", 0.9)]), &idx, false).unwrap();
        assert_eq!(outcome.selected(), Some("d.png"));
    }
}
