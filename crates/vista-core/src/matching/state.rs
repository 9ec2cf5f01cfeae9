//! Candidate pool and the sticky selection state machine.
//!
//! ```text
//!              non-empty pool (draw)
//!   NoPool  ─────────────────────────▶  Selected { pool, selected }
//!     ▲                                   │  same pool, no reset: unchanged
//!     │          empty pool               │  new pool or reset: redraw
//!     └───────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

/// Images sharing at least one tag with an extraction.
///
/// Ordered so equality checks and display are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePool {
    ids: BTreeSet<String>,
}

impl CandidatePool {
    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no image qualifies ("no matching images").
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether an image is a candidate.
    pub fn contains(&self, image_id: &str) -> bool {
        self.ids.contains(image_id)
    }

    /// Candidates in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Selection state owned by one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MatchState {
    /// The last pool was empty; nothing is selected.
    #[default]
    NoPool,

    /// A candidate was drawn from `pool` and stays until the pool changes
    /// or a reset is requested.
    Selected {
        pool: CandidatePool,
        selected: String,
    },
}

impl MatchState {
    /// The pool this state was computed for (empty for `NoPool`).
    pub fn pool(&self) -> Option<&CandidatePool> {
        match self {
            MatchState::NoPool => None,
            MatchState::Selected { pool, .. } => Some(pool),
        }
    }

    /// The selected image, if any.
    pub fn selected(&self) -> Option<&str> {
        match self {
            MatchState::NoPool => None,
            MatchState::Selected { selected, .. } => Some(selected),
        }
    }
}
