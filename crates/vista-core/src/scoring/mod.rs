//! Label scoring backends.
//!
//! - **clip**: fixed vocabulary scored by CLIP image/text similarity
//! - **tagger**: WD14-style multi-label classifier
//! - **remote**: HTTP inference endpoint

pub mod clip;
pub mod label_bank;
pub mod onnx;
pub mod preprocess;
pub mod provider;
pub mod remote;
pub mod tagger;
pub mod text_encoder;
pub mod vocabulary;

pub use provider::{LabelScorer, ScorerFactory};
