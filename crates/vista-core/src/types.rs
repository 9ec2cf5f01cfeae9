//! Core data types shared across the tagging and matching stages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A label reported by a scorer, with its confidence.
///
/// Confidence is a similarity or classification probability in `[0, 1]`;
/// higher means the label is more likely present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    /// The label (e.g., "sky", "forest")
    pub label: String,

    /// Confidence score from 0.0 to 1.0
    pub confidence: f32,
}

impl ScoredLabel {
    /// Create a new scored label.
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// The ranked, thresholded tags extracted from one image.
///
/// Entries are sorted by descending confidence, ties in scorer order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionResult {
    tags: Vec<ScoredLabel>,
}

impl ExtractionResult {
    /// Wrap tags that are already ranked and filtered.
    pub(crate) fn from_ranked(tags: Vec<ScoredLabel>) -> Self {
        Self { tags }
    }

    /// Ranked tags with their confidences.
    pub fn tags(&self) -> &[ScoredLabel] {
        &self.tags
    }

    /// Ranked labels, highest confidence first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.label.as_str())
    }

    /// Labels collected into owned strings.
    pub fn to_labels(&self) -> Vec<String> {
        self.labels().map(str::to_string).collect()
    }

    /// Number of extracted tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True when no tag passed the threshold ("no tags detected").
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Result of one matching interaction, as presented to the user.
///
/// The two empty outcomes are distinct so they can be messaged differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Extraction produced no tags; the index was not consulted.
    NoTags,

    /// Tags were found but no indexed image shares any of them.
    NoMatches { tags: Vec<String> },

    /// A reference image was selected from the candidate pool.
    Matched {
        /// Extracted tags, highest confidence first
        tags: Vec<String>,
        /// Selected image identifier
        selected: String,
        /// Number of images in the candidate pool
        pool_size: usize,
        /// Extracted tags also present on the selected image, in extraction order
        matched_tags: Vec<String>,
    },
}

impl MatchOutcome {
    /// The selected image identifier, if any.
    pub fn selected(&self) -> Option<&str> {
        match self {
            MatchOutcome::Matched { selected, .. } => Some(selected),
            _ => None,
        }
    }

    /// User-facing message for the empty outcomes.
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            MatchOutcome::NoTags => Some(
                "No scenic tags detected. Try lowering the threshold or using a different image.",
            ),
            MatchOutcome::NoMatches { .. } => {
                Some("No matching images found. Check the index or try different tags.")
            }
            MatchOutcome::Matched { .. } => None,
        }
    }
}

/// Tags extracted from one input image, plus what the CLI reports about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagReport {
    /// Path the image was read from
    pub file_path: PathBuf,

    /// File name without directory
    pub file_name: String,

    pub width: u32,
    pub height: u32,

    /// Detected format ("jpeg", "png", ...)
    pub format: String,

    /// Backend that produced the scores
    pub scorer: String,

    /// Ranked, thresholded tags
    pub tags: ExtractionResult,
}
