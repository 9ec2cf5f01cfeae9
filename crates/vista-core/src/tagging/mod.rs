//! Tag extraction: turn raw scorer output into the ranked tag list.

pub mod extract;

pub use extract::{extract, ExtractOptions};
