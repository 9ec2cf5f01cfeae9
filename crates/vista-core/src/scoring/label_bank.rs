//! Pre-computed term embeddings for fast scoring.
//!
//! The label bank stores an N×D matrix of L2-normalized text embeddings (one
//! row per vocabulary term). Scoring an image is one matrix-vector product.

use ndarray::{Array1, Array2};

use crate::error::PipelineError;

use super::text_encoder::ClipTextEncoder;
use super::vocabulary::Vocabulary;

/// Prompts per text-encoder call.
const ENCODE_BATCH: usize = 32;

/// Term embeddings, row order matching the vocabulary.
#[derive(Debug, Clone)]
pub struct LabelBank {
    matrix: Array2<f32>,
}

impl LabelBank {
    /// Create a label bank from pre-computed rows.
    ///
    /// Rows are expected to be L2-normalized already.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, PipelineError> {
        let term_count = rows.len();
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != dim) {
            return Err(PipelineError::Model {
                message: format!(
                    "Label bank row {} has {} dims, expected {}",
                    bad,
                    rows[bad].len(),
                    dim
                ),
            });
        }

        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((term_count, dim), flat).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to build label bank: {e}"),
            }
        })?;
        Ok(Self { matrix })
    }

    /// Encode every vocabulary term through `template` and stack the results.
    pub fn encode_all(
        vocabulary: &Vocabulary,
        text_encoder: &ClipTextEncoder,
        template: &str,
    ) -> Result<Self, PipelineError> {
        let prompts = vocabulary.prompts(template);
        let mut rows = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(ENCODE_BATCH) {
            rows.extend(text_encoder.encode_batch(chunk)?);
        }

        if rows.len() != vocabulary.len() {
            return Err(PipelineError::Model {
                message: format!(
                    "Text encoder returned {} embeddings for {} terms",
                    rows.len(),
                    vocabulary.len()
                ),
            });
        }

        let bank = Self::from_rows(rows)?;
        tracing::info!(
            "Label bank ready: {} terms x {} dims",
            bank.term_count(),
            bank.embedding_dim()
        );
        Ok(bank)
    }

    /// Cosine similarity of a normalized image embedding against every term.
    pub fn cosines(&self, image_embedding: &[f32]) -> Result<Vec<f32>, PipelineError> {
        if image_embedding.len() != self.embedding_dim() {
            return Err(PipelineError::Model {
                message: format!(
                    "Image embedding has {} dims, label bank expects {}",
                    image_embedding.len(),
                    self.embedding_dim()
                ),
            });
        }
        let image = Array1::from(image_embedding.to_vec());
        Ok(self.matrix.dot(&image).to_vec())
    }

    pub fn embedding_dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn term_count(&self) -> usize {
        self.matrix.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosines_against_rows() {
        let bank = LabelBank::from_rows(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            crate::math::l2_normalize(&[1.0, 1.0, 0.0]),
        ])
        .unwrap();
        assert_eq!(bank.term_count(), 3);
        assert_eq!(bank.embedding_dim(), 3);

        let sims = bank.cosines(&[1.0, 0.0, 0.0]).unwrap();
        assert!((sims[0] - 1.0).abs() < 1e-6);
        assert!(sims[1].abs() < 1e-6);
        assert!((sims[2] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = LabelBank::from_rows(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let bank = LabelBank::from_rows(vec![vec![1.0, 0.0]]).unwrap();
        assert!(bank.cosines(&[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_empty_bank() {
        let bank = LabelBank::from_rows(vec![]).unwrap();
        assert_eq!(bank.term_count(), 0);
        assert!(bank.cosines(&[]).unwrap().is_empty());
    }
}
