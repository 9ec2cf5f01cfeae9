//! Stateless match engine: candidate pool, sticky selection, explanation.
//!
//! All matching tags weigh the same; a single shared tag is enough for an
//! image to enter the pool.

use std::collections::HashSet;

use rand::seq::IteratorRandom;
use rand::Rng;

use crate::error::PipelineError;
use crate::index::TagIndex;
use crate::types::ExtractionResult;

use super::state::{CandidatePool, MatchState};

/// Images whose tag set intersects the extracted labels.
///
/// An empty extraction short-circuits to an empty pool without touching the
/// index.
pub fn compute_pool(extracted: &ExtractionResult, index: &TagIndex) -> CandidatePool {
    if extracted.is_empty() {
        return CandidatePool::default();
    }

    let wanted: HashSet<&str> = extracted.labels().collect();
    index
        .iter()
        .filter(|(_, tags)| tags.iter().any(|t| wanted.contains(t.as_str())))
        .map(|(id, _)| id)
        .collect()
}

/// Advance the selection state for `pool` using the thread-local RNG.
pub fn select(pool: &CandidatePool, previous: Option<&MatchState>, force_reset: bool) -> MatchState {
    select_with_rng(pool, previous, force_reset, &mut rand::thread_rng())
}

/// Advance the selection state for `pool`.
///
/// - empty pool: `NoPool`
/// - same pool as `previous` and no reset: `previous`, unchanged
/// - otherwise: a uniform draw over the pool
pub fn select_with_rng<R: Rng + ?Sized>(
    pool: &CandidatePool,
    previous: Option<&MatchState>,
    force_reset: bool,
    rng: &mut R,
) -> MatchState {
    if pool.is_empty() {
        return MatchState::NoPool;
    }

    if let Some(prev) = previous {
        if !force_reset && prev.pool() == Some(pool) {
            tracing::debug!("Pool unchanged ({} candidates); keeping selection", pool.len());
            return prev.clone();
        }
    }

    // `IteratorRandom::choose` is uniform over the iterator's items.
    match pool.iter().choose(rng) {
        Some(selected) => {
            tracing::debug!(
                "Drew '{}' from {} candidates (reset: {})",
                selected,
                pool.len(),
                force_reset
            );
            MatchState::Selected {
                pool: pool.clone(),
                selected: selected.to_string(),
            }
        }
        None => MatchState::NoPool,
    }
}

/// Extracted labels, in extraction order, that the selected image also carries.
///
/// Non-empty whenever `selected` was drawn from the pool of `extracted`.
pub fn explain(
    selected: &str,
    extracted: &ExtractionResult,
    index: &TagIndex,
) -> Result<Vec<String>, PipelineError> {
    let tags = index.tags_of(selected)?;
    Ok(extracted
        .labels()
        .filter(|label| tags.contains(*label))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexRow;
    use crate::tagging::{extract, ExtractOptions};
    use crate::types::ScoredLabel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn index(rows: &[(&str, &str)]) -> TagIndex {
        TagIndex::build(
            rows.iter()
                .enumerate()
                .map(|(i, (id, tags))| IndexRow::new(i + 2, *id, *tags)),
        )
        .unwrap()
    }

    fn extraction(labels: &[&str]) -> ExtractionResult {
        // Descending confidences keep the given order.
        let scores: Vec<ScoredLabel> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| ScoredLabel::new(*l, 1.0 - i as f32 * 0.01))
            .collect();
        extract(&scores, &ExtractOptions::new(labels.len().max(1), 0.0).unwrap())
    }

    fn pool(ids: &[&str]) -> CandidatePool {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_pool_and_explain_scenario() {
        let idx = index(&[("img1", "sky;sea"), ("img2", "forest")]);
        let tags = extraction(&["sky", "mountain"]);

        let p = compute_pool(&tags, &idx);
        assert_eq!(p, pool(&["img1"]));
        assert_eq!(explain("img1", &tags, &idx).unwrap(), vec!["sky"]);
    }

    #[test]
    fn test_pool_is_exact_intersection() {
        let idx = index(&[
            ("a", "sky;sea"),
            ("b", "forest"),
            ("c", "night; city"),
            ("d", ""),
            ("e", "sea"),
        ]);
        let tags = extraction(&["sea", "city"]);
        assert_eq!(compute_pool(&tags, &idx), pool(&["a", "c", "e"]));
    }

    #[test]
    fn test_pool_ignores_extraction_order() {
        let idx = index(&[("a", "sky"), ("b", "sea")]);
        assert_eq!(
            compute_pool(&extraction(&["sky", "sea"]), &idx),
            compute_pool(&extraction(&["sea", "sky"]), &idx)
        );
    }

    #[test]
    fn test_empty_extraction_short_circuits() {
        let idx = index(&[("a", "sky")]);
        assert!(compute_pool(&ExtractionResult::default(), &idx).is_empty());
    }

    #[test]
    fn test_empty_index_yields_no_selection() {
        let idx = TagIndex::default();
        let p = compute_pool(&extraction(&["sky"]), &idx);
        assert!(p.is_empty());
        assert_eq!(select(&p, None, false), MatchState::NoPool);
    }

    #[test]
    fn test_empty_pool_clears_previous_selection() {
        let previous = MatchState::Selected {
            pool: pool(&["a"]),
            selected: "a".to_string(),
        };
        assert_eq!(
            select(&CandidatePool::default(), Some(&previous), false),
            MatchState::NoPool
        );
    }

    #[test]
    fn test_same_pool_without_reset_is_sticky() {
        let p = pool(&["a", "b", "c"]);
        let previous = MatchState::Selected {
            pool: p.clone(),
            selected: "b".to_string(),
        };
        for _ in 0..50 {
            let next = select(&p, Some(&previous), false);
            assert_eq!(next, previous);
        }
    }

    #[test]
    fn test_select_twice_is_idempotent() {
        let p = pool(&["a", "b", "c", "d"]);
        let first = select(&p, None, false);
        let second = select(&p, Some(&first), false);
        assert_eq!(first.selected(), second.selected());
    }

    #[test]
    fn test_new_pool_redraws_from_new_members() {
        let previous = MatchState::Selected {
            pool: pool(&["a", "b"]),
            selected: "a".to_string(),
        };
        let p = pool(&["x", "y"]);
        let next = select(&p, Some(&previous), false);
        assert!(p.contains(next.selected().unwrap()));
        assert_eq!(next.pool(), Some(&p));
    }

    #[test]
    fn test_reset_draws_from_pool() {
        let p = pool(&["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = select_with_rng(&p, None, false, &mut rng);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            state = select_with_rng(&p, Some(&state), true, &mut rng);
            let selected = state.selected().unwrap().to_string();
            assert!(p.contains(&selected));
            seen.insert(selected);
        }
        // A reset is free to change the selection; over many draws it does.
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_draw_is_roughly_uniform() {
        let p = pool(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<String, usize> = HashMap::new();
        let draws = 8000;
        for _ in 0..draws {
            let state = select_with_rng(&p, None, true, &mut rng);
            *counts.entry(state.selected().unwrap().to_string()).or_default() += 1;
        }
        let expected = draws / p.len();
        for id in p.iter() {
            let n = counts[id];
            assert!(
                n > expected * 8 / 10 && n < expected * 12 / 10,
                "{id} drawn {n} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn test_previous_no_pool_draws() {
        let p = pool(&["a"]);
        let next = select(&p, Some(&MatchState::NoPool), false);
        assert_eq!(next.selected(), Some("a"));
    }

    #[test]
    fn test_explain_keeps_extraction_order() {
        let idx = index(&[("a", "lake;sun;sky")]);
        let tags = extraction(&["sky", "river", "sun", "lake"]);
        assert_eq!(
            explain("a", &tags, &idx).unwrap(),
            vec!["sky", "sun", "lake"]
        );
    }

    #[test]
    fn test_explain_non_empty_for_every_pool_member() {
        let idx = index(&[
            ("a", "sky;sea"),
            ("b", "forest"),
            ("c", "sea;beach"),
            ("d", "night"),
        ]);
        let tags = extraction(&["beach", "sky", "forest"]);
        let p = compute_pool(&tags, &idx);
        for id in p.iter() {
            let why = explain(id, &tags, &idx).unwrap();
            assert!(!why.is_empty());
            assert!(why.iter().all(|t| tags.labels().any(|l| l == t)));
        }
    }

    #[test]
    fn test_explain_unknown_image() {
        let idx = index(&[("a", "sky")]);
        assert!(matches!(
            explain("zzz", &extraction(&["sky"]), &idx),
            Err(PipelineError::UnknownImage(_))
        ));
    }
}
