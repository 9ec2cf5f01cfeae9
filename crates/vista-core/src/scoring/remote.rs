//! Scorer that delegates to a remote image-classification endpoint.
//!
//! Sends the encoded image as base64 in `{"inputs": ...}` and expects a list
//! of `{label, score}` predictions back (Hugging Face inference API shape).
//! Failures are reported once; this backend never retries.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::pipeline::DecodedImage;
use crate::types::ScoredLabel;

use super::provider::LabelScorer;

const BACKEND: &str = "remote";

/// HTTP inference scorer.
pub struct RemoteScorer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteScorer {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, PipelineError> {
        if endpoint.trim().is_empty() {
            return Err(PipelineError::Model {
                message: "Remote scorer endpoint is not configured".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct Prediction {
    label: String,
    score: f32,
}

/// Endpoints return either a flat list or a list per input.
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<Prediction>),
    Nested(Vec<Vec<Prediction>>),
}

/// Parse a response body into scored labels, clamping scores into [0, 1].
fn parse_response(body: &str) -> Result<Vec<ScoredLabel>, PipelineError> {
    let parsed: InferenceResponse = serde_json::from_str(body).map_err(|e| {
        PipelineError::scoring(BACKEND, format!("Malformed response body: {e}"))
    })?;

    let predictions = match parsed {
        InferenceResponse::Flat(p) => p,
        InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
    };

    Ok(predictions
        .into_iter()
        .map(|p| ScoredLabel::new(p.label, p.score.clamp(0.0, 1.0)))
        .collect())
}

#[async_trait]
impl LabelScorer for RemoteScorer {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn score(&self, image: &DecodedImage) -> Result<Vec<ScoredLabel>, PipelineError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let body = InferenceRequest { inputs: &encoded };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let resp = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request timed out: {e}")
            } else {
                format!("Request failed: {e}")
            };
            PipelineError::scoring(BACKEND, message)
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| PipelineError::ScoringFailure {
            backend: BACKEND.to_string(),
            message: format!("Failed to read response body: {e}"),
            status_code: Some(status.as_u16()),
        })?;

        if !status.is_success() {
            return Err(PipelineError::ScoringFailure {
                backend: BACKEND.to_string(),
                message: format!("HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let labels = parse_response(&text)?;
        tracing::debug!("Remote scorer returned {} labels", labels.len());
        Ok(labels)
    }
}
