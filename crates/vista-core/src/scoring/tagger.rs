//! Open-vocabulary multi-label tagger (WD14 style).
//!
//! The model emits one sigmoid probability per row of `selected_tags.csv`.
//! Only general-category rows are reported, optionally narrowed further by an
//! allow-list file.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::TaggerConfig;
use crate::error::PipelineError;
use crate::index::source::{read_records, Record};
use crate::pipeline::DecodedImage;
use crate::types::ScoredLabel;

use super::onnx::OnnxModel;
use super::preprocess::preprocess_tagger;
use super::provider::{require_file, LabelScorer};
use super::vocabulary::Vocabulary;

const BACKEND: &str = "tagger";

/// `category` value of general (non-character, non-rating) tags.
const GENERAL_CATEGORY: &str = "0";

/// Tags this short are kaomoji-like (`^_^`, `o_o`) and keep their underscores.
const KAOMOJI_MAX_LEN: usize = 3;

/// A reported label and the model output it reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggerLabel {
    pub output_index: usize,
    pub name: String,
}

/// Human-readable form of a raw tag name.
pub fn display_name(raw: &str) -> String {
    if raw.chars().count() <= KAOMOJI_MAX_LEN {
        raw.to_string()
    } else {
        raw.replace('_', " ")
    }
}

/// Parse `selected_tags.csv` (`tag_id,name,category,count`) into the general
/// labels, keeping each row's position as its output index.
pub fn parse_selected_tags(content: &str) -> Result<Vec<TaggerLabel>, PipelineError> {
    let malformed = |e: PipelineError| PipelineError::Model {
        message: format!("Invalid selected_tags.csv: {e}"),
    };

    let mut records = read_records(content).map_err(malformed)?.into_iter();
    let header = records.next().ok_or_else(|| PipelineError::Model {
        message: "selected_tags.csv is empty".to_string(),
    })?;

    let column = |name: &str| {
        header
            .fields
            .iter()
            .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| PipelineError::Model {
                message: format!("selected_tags.csv has no '{name}' column"),
            })
    };
    let name_col = column("name")?;
    let category_col = column("category")?;

    let mut labels = Vec::new();
    let mut output_index = 0;
    for Record { fields, .. } in records {
        let name = fields.get(name_col).map(|s| s.trim()).unwrap_or_default();
        let category = fields.get(category_col).map(|s| s.trim()).unwrap_or_default();

        if category == GENERAL_CATEGORY && !name.is_empty() {
            labels.push(TaggerLabel {
                output_index,
                name: display_name(name),
            });
        }
        output_index += 1;
    }

    Ok(labels)
}

/// Keep only labels named in the allow-list (raw or display form).
fn restrict(labels: Vec<TaggerLabel>, allowed: &Vocabulary) -> Vec<TaggerLabel> {
    let allowed: HashSet<String> = allowed.terms().iter().map(|t| display_name(t)).collect();
    labels
        .into_iter()
        .filter(|l| allowed.contains(&l.name))
        .collect()
}

/// Pair the probability row with the reported labels.
fn label_scores(labels: &[TaggerLabel], probs: &[f32]) -> Result<Vec<ScoredLabel>, PipelineError> {
    labels
        .iter()
        .map(|l| {
            probs
                .get(l.output_index)
                .map(|&p| ScoredLabel::new(l.name.clone(), p.clamp(0.0, 1.0)))
                .ok_or_else(|| {
                    PipelineError::scoring(
                        BACKEND,
                        format!(
                            "Model output has {} values but label '{}' reads index {}",
                            probs.len(),
                            l.name,
                            l.output_index
                        ),
                    )
                })
        })
        .collect()
}

/// Multi-label tagger scorer.
pub struct TaggerScorer {
    model: Arc<OnnxModel>,
    labels: Arc<Vec<TaggerLabel>>,
    image_size: u32,
}

impl TaggerScorer {
    /// Load `model.onnx` and `selected_tags.csv` from `model_dir`.
    pub fn load(config: &TaggerConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let model_path = model_dir.join("model.onnx");
        let tags_path = model_dir.join("selected_tags.csv");
        require_file(&model_path, "Tagger model")?;
        require_file(&tags_path, "Tagger label file")?;

        let content = std::fs::read_to_string(&tags_path).map_err(|e| PipelineError::Model {
            message: format!("Failed to read {:?}: {}", tags_path, e),
        })?;
        let mut labels = parse_selected_tags(&content)?;

        if let Some(file) = &config.selected_tags_file {
            let allowed = Vocabulary::load(&crate::config::expand(file))?;
            labels = restrict(labels, &allowed);
        }

        if labels.is_empty() {
            return Err(PipelineError::Model {
                message: "Tagger has no labels to report".to_string(),
            });
        }

        let model = OnnxModel::load(&model_path)?;
        tracing::info!(
            "Tagger ready: {} labels, {}px input",
            labels.len(),
            config.image_size
        );

        Ok(Self {
            model: Arc::new(model),
            labels: Arc::new(labels),
            image_size: config.image_size,
        })
    }

    /// Check whether the tagger model files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join("model.onnx").exists() && model_dir.join("selected_tags.csv").exists()
    }
}

#[async_trait]
impl LabelScorer for TaggerScorer {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn score(&self, image: &DecodedImage) -> Result<Vec<ScoredLabel>, PipelineError> {
        let model = Arc::clone(&self.model);
        let labels = Arc::clone(&self.labels);
        let image_size = self.image_size;
        let pixels = image.image.clone();

        tokio::task::spawn_blocking(move || {
            let tensor = preprocess_tagger(&pixels, image_size);
            let probs = model
                .run_image(&tensor, &[])
                .and_then(|out| out.first_row())
                .map_err(|message| PipelineError::scoring(BACKEND, message))?;
            label_scores(&labels, &probs)
        })
        .await
        .map_err(|e| PipelineError::scoring(BACKEND, format!("Task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGS_CSV: &str = "\
tag_id,name,category,count
9999999,general,9,807879
212816,outdoors,0,600000
1,1girl,4,5000000
470575,blue_sky,0,120000
8601,^_^,0,2000
15080,cloud,0,90000
";

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("blue_sky"), "blue sky");
        assert_eq!(display_name("^_^"), "^_^");
        assert_eq!(display_name("o_o"), "o_o");
        assert_eq!(display_name("sky"), "sky");
    }

    #[test]
    fn test_parse_keeps_general_rows_with_positions() {
        let labels = parse_selected_tags(TAGS_CSV).unwrap();
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["outdoors", "blue sky", "^_^", "cloud"]);
        let indices: Vec<_> = labels.iter().map(|l| l.output_index).collect();
        assert_eq!(indices, vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_parse_requires_columns() {
        assert!(parse_selected_tags("tag_id,label\n1,sky\n").is_err());
        assert!(parse_selected_tags("").is_err());
    }

    #[test]
    fn test_restrict_to_allow_list() {
        let labels = parse_selected_tags(TAGS_CSV).unwrap();
        let allowed = Vocabulary::from_terms(["blue_sky", "cloud", "mountain"]);
        let kept: Vec<_> = restrict(labels, &allowed)
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(kept, vec!["blue sky", "cloud"]);
    }

    #[test]
    fn test_label_scores_read_output_positions() {
        let labels = parse_selected_tags(TAGS_CSV).unwrap();
        let probs = [0.9, 0.8, 0.99, 0.4, 0.05, 1.2];
        let scores = label_scores(&labels, &probs).unwrap();
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0], ScoredLabel::new("outdoors", 0.8));
        assert_eq!(scores[1], ScoredLabel::new("blue sky", 0.4));
        assert_eq!(scores[3], ScoredLabel::new("cloud", 1.0));
    }

    #[test]
    fn test_short_output_is_scoring_failure() {
        let labels = parse_selected_tags(TAGS_CSV).unwrap();
        let err = label_scores(&labels, &[0.1, 0.2]).unwrap_err();
        assert!(matches!(err, PipelineError::ScoringFailure { .. }));
    }

    #[test]
    fn test_missing_model_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!TaggerScorer::model_exists(dir.path()));
        let err = TaggerScorer::load(&TaggerConfig::default(), dir.path()).err().unwrap();
        assert!(matches!(err, PipelineError::Model { .. }));
    }
}
