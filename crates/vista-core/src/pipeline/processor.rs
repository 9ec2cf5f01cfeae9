//! Tagging pipeline orchestration: decode, score, extract.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::PipelineError;
use crate::scoring::LabelScorer;
use crate::tagging::{extract, ExtractOptions};
use crate::types::{ExtractionResult, TagReport};

use super::decode::{format_to_string, DecodedImage, ImageDecoder};

/// Runs one input image through decode → score → extract.
///
/// Holds no per-request state; a single tagger serves every session.
#[derive(Clone)]
pub struct ImageTagger {
    decoder: ImageDecoder,
    scorer: Arc<dyn LabelScorer>,
}

impl ImageTagger {
    pub fn new(config: &Config, scorer: Arc<dyn LabelScorer>) -> Self {
        Self {
            decoder: ImageDecoder::new(config.limits.clone()),
            scorer,
        }
    }

    /// Name of the active scorer backend.
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    pub fn decoder(&self) -> &ImageDecoder {
        &self.decoder
    }

    /// Score an already-decoded image and extract its tags.
    pub async fn tag_image(
        &self,
        image: &DecodedImage,
        options: &ExtractOptions,
    ) -> Result<ExtractionResult, PipelineError> {
        let score_start = Instant::now();
        let scores = self.scorer.score(image).await?;
        tracing::trace!(
            "  Score ({}): {:?}, {} labels",
            self.scorer.name(),
            score_start.elapsed(),
            scores.len()
        );

        let tags = extract(&scores, options);
        if tags.is_empty() {
            tracing::debug!(
                "No label reached {:.2} ({} scored)",
                options.min_confidence(),
                scores.len()
            );
        }
        Ok(tags)
    }

    fn malformed_input(&self, error: PipelineError) -> PipelineError {
        match error {
            PipelineError::Decode { .. } | PipelineError::UnsupportedFormat { .. } => {
                PipelineError::scoring(self.scorer.name(), error.to_string())
            }
            other => other,
        }
    }

    /// Decode the file at `path`, then tag it.
    ///
    /// An input that exists but cannot be decoded is a `ScoringFailure` for
    /// this request. Missing files, size limits and timeouts keep their own
    /// variants.
    pub async fn tag_path(
        &self,
        path: &Path,
        options: &ExtractOptions,
    ) -> Result<TagReport, PipelineError> {
        let start = Instant::now();
        tracing::debug!("Tagging: {:?}", path);

        let decode_start = Instant::now();
        let decoded = self
            .decoder
            .decode(path)
            .await
            .map_err(|e| self.malformed_input(e))?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        let tags = self.tag_image(&decoded, options).await?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!(
            "Tagged {:?} in {:?} ({}x{}, {} tags)",
            file_name,
            start.elapsed(),
            decoded.width,
            decoded.height,
            tags.len()
        );

        Ok(TagReport {
            file_path: path.to_path_buf(),
            file_name,
            width: decoded.width,
            height: decoded.height,
            format: format_to_string(decoded.format).to_string(),
            scorer: self.scorer.name().to_string(),
            tags,
        })
    }
}
