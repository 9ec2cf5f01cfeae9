//! ONNX Runtime session management shared by the local scorer backends.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::{Session, SessionOutputs};
use ort::value::Value;

use crate::error::PipelineError;

/// A flat output tensor copied out of the session.
#[derive(Debug, Clone)]
pub struct OutputTensor {
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    /// First row of a `[1, N]` (or `[N]`) output.
    pub fn first_row(self) -> Result<Vec<f32>, String> {
        match self.shape.len() {
            1 => Ok(self.data),
            2 => {
                let width = self.shape[1] as usize;
                Ok(self.data.into_iter().take(width).collect())
            }
            _ => Err(format!("Unexpected output shape: {:?}", self.shape)),
        }
    }
}

/// Wraps an ONNX Runtime session.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxModel {
    session: Mutex<Session>,
    input_names: Vec<String>,
    path: PathBuf,
}

impl OnnxModel {
    /// Load a model from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load ONNX model {:?}: {e}", model_path),
            })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        tracing::debug!(
            "Loaded ONNX model from {:?} (inputs: {:?}, outputs: {:?})",
            model_path,
            input_names,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            path: model_path.to_path_buf(),
        })
    }

    /// Whether the model declares an input with this name.
    pub fn has_input(&self, name: &str) -> bool {
        self.input_names.iter().any(|n| n == name)
    }

    /// Name of the first declared input, or `fallback`.
    pub fn first_input<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.input_names.first().map(String::as_str).unwrap_or(fallback)
    }

    /// Run a single image tensor through the model.
    ///
    /// Returns the first output named in `preferred`, or the model's first
    /// output when none of them exist.
    pub fn run_image(
        &self,
        tensor: &Array4<f32>,
        preferred: &[&str],
    ) -> Result<OutputTensor, String> {
        // Convert ndarray to (shape, flat_data) for ort.
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| format!("Failed to create input tensor: {e}"))?;
        let input_name = self.first_input("pixel_values").to_string();

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Session lock poisoned: {e}"))?;
        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_value])
            .map_err(|e| format!("ONNX inference failed ({:?}): {e}", self.path))?;

        extract_output(&outputs, preferred)
    }

    /// Run a batch of token sequences `[batch, seq_len]` through a text model.
    ///
    /// `attention_mask` is only passed when the model declares it.
    pub fn run_tokens(
        &self,
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        batch_size: usize,
        seq_len: usize,
        preferred: &[&str],
    ) -> Result<OutputTensor, String> {
        let shape = vec![batch_size as i64, seq_len as i64];
        let ids_value = Value::from_array((shape.clone(), input_ids))
            .map_err(|e| format!("Failed to create input_ids tensor: {e}"))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Session lock poisoned: {e}"))?;

        let outputs = if self.has_input("attention_mask") {
            let mask_value = Value::from_array((shape, attention_mask))
                .map_err(|e| format!("Failed to create attention_mask tensor: {e}"))?;
            session.run(ort::inputs![
                "input_ids" => ids_value,
                "attention_mask" => mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => ids_value])
        }
        .map_err(|e| format!("Text model inference failed: {e}"))?;

        extract_output(&outputs, preferred)
    }
}

/// Copy the preferred output (or the first one) out of the session outputs.
fn extract_output(outputs: &SessionOutputs, preferred: &[&str]) -> Result<OutputTensor, String> {
    let (name, value) = preferred
        .iter()
        .find_map(|want| outputs.iter().find(|(name, _)| name == want))
        .or_else(|| outputs.iter().next())
        .ok_or_else(|| "Model produced no outputs".to_string())?;

    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| format!("Failed to extract output '{name}': {e}"))?;

    Ok(OutputTensor {
        shape: shape.iter().copied().collect(),
        data: data.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_row_of_batch_output() {
        let out = OutputTensor {
            shape: vec![1, 3],
            data: vec![0.1, 0.2, 0.3],
        };
        assert_eq!(out.first_row().unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_first_row_of_flat_output() {
        let out = OutputTensor {
            shape: vec![2],
            data: vec![0.5, 0.6],
        };
        assert_eq!(out.first_row().unwrap(), vec![0.5, 0.6]);
    }

    #[test]
    fn test_first_row_rejects_3d() {
        let out = OutputTensor {
            shape: vec![1, 2, 2],
            data: vec![0.0; 4],
        };
        assert!(out.first_row().is_err());
    }

    #[test]
    fn test_load_missing_model_is_model_error() {
        let err = OnnxModel::load(Path::new("/nonexistent/model.onnx")).err().unwrap();
        assert!(matches!(err, PipelineError::Model { .. }));
    }
}
