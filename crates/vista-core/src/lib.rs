//! Vista Core - scenic tag extraction and tag-overlap image matching.
//!
//! Vista takes a photo, reports the scenic labels a vision model sees in it,
//! and picks a reference image that shares at least one of those labels.
//!
//! # Architecture
//!
//! ```text
//! Image → Decode → Score (clip | tagger | remote) → Extract top-k ≥ threshold
//!                                                        ↓
//!                       Tag index → Candidate pool → Sticky random selection
//! ```
//!
//! The scorer and the tag index are read-only after construction and shared
//! by every session. Selection state lives in a per-session `MatchSession`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vista_core::{Config, MatchSession, Vista};
//!
//! #[tokio::main]
//! async fn main() -> vista_core::Result<()> {
//!     let vista = Vista::new(Config::load()?)?;
//!     let options = vista.default_options()?;
//!     let mut session = MatchSession::new();
//!
//!     let (report, outcome) = vista
//!         .match_path(&mut session, "./photo.jpg".as_ref(), &options, false)
//!         .await?;
//!     println!("Tags: {:?} -> {:?}", report.tags.to_labels(), outcome.selected());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod index;
pub mod math;
pub mod matching;
pub mod pipeline;
pub mod scoring;
pub mod tagging;
pub mod types;

use std::path::Path;
use std::sync::Arc;

// Re-exports for convenient access
pub use config::{Config, ScorerBackend};
pub use error::{ConfigError, PipelineError, PipelineResult, Result, VistaError};
pub use index::{ImageResolver, IndexSource, TagIndex};
pub use matching::{CandidatePool, MatchSession, MatchState};
pub use pipeline::{DecodedImage, ImageDecoder, ImageTagger};
pub use scoring::{LabelScorer, ScorerFactory};
pub use tagging::{extract, ExtractOptions};
pub use types::{ExtractionResult, MatchOutcome, ScoredLabel, TagReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The main entry point: a tagger, the tag index, and the image resolver.
///
/// Everything here is immutable and shareable; per-session selection state
/// is passed in as a `MatchSession`.
#[derive(Clone)]
pub struct Vista {
    config: Config,
    tagger: ImageTagger,
    index: Arc<TagIndex>,
    resolver: ImageResolver,
}

impl Vista {
    /// Build the configured scorer and load the configured index.
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing Vista v{}", VERSION);
        let scorer = ScorerFactory::create(&config)?;
        let index = IndexSource::from_config(&config.index).load(&config.index_path())?;
        Ok(Self::with_parts(config, Arc::from(scorer), index))
    }

    /// Assemble from an existing scorer and index.
    pub fn with_parts(config: Config, scorer: Arc<dyn LabelScorer>, index: TagIndex) -> Self {
        let tagger = ImageTagger::new(&config, scorer);
        let resolver = ImageResolver::new(config.image_root(), tagger.decoder().clone());
        Self {
            config,
            tagger,
            index: Arc::new(index),
            resolver,
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    pub fn tagger(&self) -> &ImageTagger {
        &self.tagger
    }

    /// Extraction options from the `[tagging]` config section.
    pub fn default_options(&self) -> Result<ExtractOptions> {
        Ok(ExtractOptions::new(
            self.config.tagging.max_tags,
            self.config.tagging.min_confidence,
        )?)
    }

    /// Tag the image at `path`.
    pub async fn tag(&self, path: &Path, options: &ExtractOptions) -> Result<TagReport> {
        Ok(self.tagger.tag_path(path, options).await?)
    }

    /// Tag the image at `path` and advance `session`'s selection.
    pub async fn match_path(
        &self,
        session: &mut MatchSession,
        path: &Path,
        options: &ExtractOptions,
        force_reset: bool,
    ) -> Result<(TagReport, MatchOutcome)> {
        let report = self.tagger.tag_path(path, options).await?;
        let outcome = session.evaluate(&report.tags, &self.index, force_reset)?;
        Ok((report, outcome))
    }

    /// Re-evaluate already extracted tags (e.g. "reset random match").
    pub fn rematch(
        &self,
        session: &mut MatchSession,
        tags: &ExtractionResult,
        force_reset: bool,
    ) -> Result<MatchOutcome> {
        Ok(session.evaluate(tags, &self.index, force_reset)?)
    }

    /// Load the selected reference image for display.
    pub async fn open_selected(&self, image_id: &str) -> Result<DecodedImage> {
        Ok(self.resolver.open(image_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexRow;
    use async_trait::async_trait;

    struct FixedScorer;

    #[async_trait]
    impl LabelScorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn score(&self, _image: &DecodedImage) -> PipelineResult<Vec<ScoredLabel>> {
            Ok(vec![
                ScoredLabel::new("sky", 0.9),
                ScoredLabel::new("mountain", 0.6),
            ])
        }
    }

    fn vista() -> Vista {
        let index = TagIndex::build(vec![
            IndexRow::new(2, "img1.png", "sky;sea"),
            IndexRow::new(3, "img2.png", "forest"),
        ])
        .unwrap();
        Vista::with_parts(Config::default(), Arc::new(FixedScorer), index)
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_options_follow_config() {
        let options = vista().default_options().unwrap();
        assert_eq!(options.top_k(), 5);
        assert!((options.min_confidence() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rematch_is_sticky() {
        let vista = vista();
        let tags = extract(
            &[ScoredLabel::new("sky", 0.9)],
            &vista.default_options().unwrap(),
        );
        let mut session = MatchSession::with_seed(4);
        let first = vista.rematch(&mut session, &tags, false).unwrap();
        assert_eq!(first.selected(), Some("img1.png"));
        assert_eq!(vista.rematch(&mut session, &tags, false).unwrap(), first);
    }

    #[tokio::test]
    async fn test_match_path_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        std::fs::write(&path, crate::pipeline::decode::tests::png_bytes(6, 6, [1, 2, 3])).unwrap();

        let vista = vista();
        let mut session = MatchSession::with_seed(1);
        let (report, outcome) = vista
            .match_path(&mut session, &path, &vista.default_options().unwrap(), false)
            .await
            .unwrap();

        assert_eq!(report.tags.to_labels(), vec!["sky", "mountain"]);
        match outcome {
            MatchOutcome::Matched {
                selected,
                matched_tags,
                pool_size,
                ..
            } => {
                assert_eq!(selected, "img1.png");
                assert_eq!(matched_tags, vec!["sky"]);
                assert_eq!(pool_size, 1);
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }
}
