//! Tag-overlap matching against the reference index.
//!
//! The engine functions are stateless; `MatchSession` owns the selection
//! state for one user session.

pub mod engine;
pub mod session;
pub mod state;

pub use engine::{compute_pool, explain, select, select_with_rng};
pub use session::MatchSession;
pub use state::{CandidatePool, MatchState};
