//! CLIP text encoder for building label embeddings.
//!
//! Loads the CLIP text ONNX model and tokenizer, encodes prompts to vectors
//! in the same space as the visual encoder.

use std::path::Path;

use crate::error::PipelineError;

use super::onnx::{OnnxModel, OutputTensor};
use super::provider::require_file;

/// CLIP context length.
const MAX_LENGTH: usize = 77;

/// Output names tried in order before falling back to the first output.
const TEXT_OUTPUTS: &[&str] = &["text_embeds", "pooler_output"];

/// CLIP text encoder wrapper.
pub struct ClipTextEncoder {
    model: OnnxModel,
    tokenizer: tokenizers::Tokenizer,
}

impl ClipTextEncoder {
    /// Load the text encoder from the model directory.
    ///
    /// Expects `text_model.onnx` and `tokenizer.json` in `model_dir`.
    pub fn new(model_dir: &Path) -> Result<Self, PipelineError> {
        let text_model_path = model_dir.join("text_model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        require_file(&text_model_path, "Text encoder")?;
        require_file(&tokenizer_path, "Tokenizer")?;

        let model = OnnxModel::load(&text_model_path)?;
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load tokenizer: {e}"),
            }
        })?;

        Ok(Self { model, tokenizer })
    }

    /// Encode a batch of prompts to L2-normalized embeddings, one per prompt.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = texts.len();
        if batch_size == 0 {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| PipelineError::Model {
                message: format!("Tokenization failed: {e}"),
            })?;

        let (input_ids, attention_mask) = pad_batch(
            encodings.iter().map(|e| e.get_ids()),
            batch_size,
        );

        let output = self
            .model
            .run_tokens(input_ids, attention_mask, batch_size, MAX_LENGTH, TEXT_OUTPUTS)
            .map_err(|message| PipelineError::Model { message })?;

        split_embeddings(output, batch_size)
    }

    /// Check whether the text encoder model files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join("text_model.onnx").exists() && model_dir.join("tokenizer.json").exists()
    }
}

/// Split a `[batch, dim]` output into normalized rows.
fn split_embeddings(output: OutputTensor, batch_size: usize) -> Result<Vec<Vec<f32>>, PipelineError> {
    let dim = match output.shape.as_slice() {
        [rows, dim] if *rows as usize == batch_size && *dim > 0 => *dim as usize,
        shape => {
            return Err(PipelineError::Model {
                message: format!("Unexpected text encoder output shape: {shape:?}"),
            })
        }
    };
    if output.data.len() != batch_size * dim {
        return Err(PipelineError::Model {
            message: format!(
                "Text encoder returned {} values for shape [{batch_size}, {dim}]",
                output.data.len()
            ),
        });
    }

    Ok(output
        .data
        .chunks(dim)
        .map(crate::math::l2_normalize)
        .collect())
}

/// Pad (or truncate) token id rows to `MAX_LENGTH` with 0, plus a matching mask.
fn pad_batch<'a>(rows: impl Iterator<Item = &'a [u32]>, batch_size: usize) -> (Vec<i64>, Vec<i64>) {
    let mut input_ids = vec![0i64; batch_size * MAX_LENGTH];
    let mut attention_mask = vec![0i64; batch_size * MAX_LENGTH];

    for (i, ids) in rows.enumerate() {
        for (j, &id) in ids.iter().take(MAX_LENGTH).enumerate() {
            input_ids[i * MAX_LENGTH + j] = id as i64;
            attention_mask[i * MAX_LENGTH + j] = 1;
        }
    }
    (input_ids, attention_mask)
}
