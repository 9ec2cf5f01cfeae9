//! Fixed-vocabulary scorer backed by CLIP image/text similarity.
//!
//! The label bank is encoded once at construction; each `score` call runs the
//! visual encoder and a single matrix-vector product against it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Calibration, ClipConfig};
use crate::error::PipelineError;
use crate::pipeline::DecodedImage;
use crate::types::ScoredLabel;

use super::label_bank::LabelBank;
use super::onnx::OnnxModel;
use super::preprocess::preprocess_clip;
use super::provider::{require_file, LabelScorer};
use super::text_encoder::ClipTextEncoder;
use super::vocabulary::Vocabulary;

const BACKEND: &str = "clip";

/// Output names tried in order before falling back to the first output.
const IMAGE_OUTPUTS: &[&str] = &["image_embeds", "pooler_output"];

/// Maps a cosine similarity to a confidence in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    mode: Calibration,
    scale: f32,
    bias: f32,
}

impl Calibrator {
    pub fn from_config(config: &ClipConfig) -> Self {
        Self {
            mode: config.calibration,
            scale: config.logit_scale,
            bias: config.logit_bias,
        }
    }

    pub fn apply(&self, cosine: f32) -> f32 {
        match self.mode {
            Calibration::Cosine => cosine.clamp(0.0, 1.0),
            Calibration::Sigmoid => crate::math::sigmoid(self.scale * cosine + self.bias),
        }
    }
}

/// CLIP similarity scorer.
pub struct ClipScorer {
    visual: Arc<OnnxModel>,
    bank: Arc<LabelBank>,
    terms: Arc<Vec<String>>,
    image_size: u32,
    calibrator: Calibrator,
}

impl ClipScorer {
    /// Load the encoders from `model_dir` and encode the vocabulary.
    ///
    /// Expects `visual.onnx`, `text_model.onnx` and `tokenizer.json`.
    pub fn load(config: &ClipConfig, model_dir: &Path) -> Result<Self, PipelineError> {
        let visual_path = model_dir.join("visual.onnx");
        require_file(&visual_path, "CLIP visual encoder")?;

        let vocabulary = Vocabulary::from_config(config)?;
        let text_encoder = ClipTextEncoder::new(model_dir)?;
        let bank = LabelBank::encode_all(&vocabulary, &text_encoder, &config.prompt_template)?;
        let visual = OnnxModel::load(&visual_path)?;

        tracing::info!(
            "CLIP scorer ready: {} terms, {}px input, {:?} calibration",
            vocabulary.len(),
            config.image_size,
            config.calibration
        );

        Ok(Self::from_parts(
            visual,
            bank,
            vocabulary.terms().to_vec(),
            config.image_size,
            Calibrator::from_config(config),
        ))
    }

    fn from_parts(
        visual: OnnxModel,
        bank: LabelBank,
        terms: Vec<String>,
        image_size: u32,
        calibrator: Calibrator,
    ) -> Self {
        Self {
            visual: Arc::new(visual),
            bank: Arc::new(bank),
            terms: Arc::new(terms),
            image_size,
            calibrator,
        }
    }

    /// Check whether all CLIP model files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join("visual.onnx").exists() && ClipTextEncoder::model_exists(model_dir)
    }
}

/// Pair each term with its calibrated similarity.
fn label_scores(terms: &[String], cosines: &[f32], calibrator: &Calibrator) -> Vec<ScoredLabel> {
    terms
        .iter()
        .zip(cosines)
        .map(|(term, &cos)| ScoredLabel::new(term.clone(), calibrator.apply(cos)))
        .collect()
}

#[async_trait]
impl LabelScorer for ClipScorer {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn score(&self, image: &DecodedImage) -> Result<Vec<ScoredLabel>, PipelineError> {
        let visual = Arc::clone(&self.visual);
        let bank = Arc::clone(&self.bank);
        let terms = Arc::clone(&self.terms);
        let calibrator = self.calibrator;
        let image_size = self.image_size;
        let pixels = image.image.clone();

        tokio::task::spawn_blocking(move || {
            let tensor = preprocess_clip(&pixels, image_size);
            let mut embedding = visual
                .run_image(&tensor, IMAGE_OUTPUTS)
                .and_then(|out| out.first_row())
                .map_err(|message| PipelineError::scoring(BACKEND, message))?;
            crate::math::l2_normalize_in_place(&mut embedding);

            let cosines = bank
                .cosines(&embedding)
                .map_err(|e| PipelineError::scoring(BACKEND, e.to_string()))?;
            Ok(label_scores(&terms, &cosines, &calibrator))
        })
        .await
        .map_err(|e| PipelineError::scoring(BACKEND, format!("Task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrator(mode: Calibration) -> Calibrator {
        Calibrator::from_config(&ClipConfig {
            calibration: mode,
            ..ClipConfig::default()
        })
    }

    #[test]
    fn test_cosine_calibration_clamps() {
        let c = calibrator(Calibration::Cosine);
        assert_eq!(c.apply(0.31), 0.31);
        assert_eq!(c.apply(-0.2), 0.0);
        assert_eq!(c.apply(1.5), 1.0);
    }

    #[test]
    fn test_sigmoid_calibration() {
        let c = calibrator(Calibration::Sigmoid);
        // 100 * 0.25 - 25 = 0 -> 0.5
        assert!((c.apply(0.25) - 0.5).abs() < 1e-6);
        assert!(c.apply(0.35) > 0.99);
        assert!(c.apply(0.15) < 0.01);
    }

    #[test]
    fn test_calibrated_scores_stay_in_range() {
        for mode in [Calibration::Cosine, Calibration::Sigmoid] {
            let c = calibrator(mode);
            for i in -20..=20 {
                let v = c.apply(i as f32 / 10.0);
                assert!((0.0..=1.0).contains(&v), "{mode:?} produced {v}");
            }
        }
    }

    #[test]
    fn test_label_scores_follow_term_order() {
        let terms = vec!["sky".to_string(), "sea".to_string()];
        let scores = label_scores(&terms, &[0.3, 0.1], &calibrator(Calibration::Cosine));
        assert_eq!(scores[0].label, "sky");
        assert_eq!(scores[1].label, "sea");
        assert!((scores[0].confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_model_exists_requires_all_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("visual.onnx"), b"").unwrap();
        assert!(!ClipScorer::model_exists(dir.path()));
        std::fs::write(dir.path().join("text_model.onnx"), b"").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), b"").unwrap();
        assert!(ClipScorer::model_exists(dir.path()));
    }
}
