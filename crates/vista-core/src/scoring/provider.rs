//! Label scorer trait and the factory that builds a backend from config.
//!
//! Every backend answers the same question: given an image, which labels
//! apply and how confidently. Calling code never branches on the backend.

use std::path::Path;

use async_trait::async_trait;

use crate::config::{Config, ScorerBackend};
use crate::error::PipelineError;
use crate::pipeline::DecodedImage;
use crate::types::ScoredLabel;

/// Trait that all label scorers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LabelScorer>` for dynamic dispatch).
///
/// Implementations must not mutate shared state, and must not retry on
/// failure: errors surface as `PipelineError::ScoringFailure`.
#[async_trait]
pub trait LabelScorer: Send + Sync {
    /// Backend name for logging (e.g., "clip", "remote").
    fn name(&self) -> &str;

    /// Score an image. No ordering guarantee on the returned labels.
    async fn score(&self, image: &DecodedImage) -> Result<Vec<ScoredLabel>, PipelineError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the configured scorer backend.
pub struct ScorerFactory;

impl ScorerFactory {
    /// Create the scorer named by `config.scorer.backend`.
    pub fn create(config: &Config) -> Result<Box<dyn LabelScorer>, PipelineError> {
        Self::create_backend(config.scorer.backend, config)
    }

    /// Create a specific backend, ignoring `config.scorer.backend`.
    ///
    /// Model files are looked up under `config.model_dir()`.
    pub fn create_backend(
        backend: ScorerBackend,
        config: &Config,
    ) -> Result<Box<dyn LabelScorer>, PipelineError> {
        let model_dir = config.model_dir();
        tracing::debug!("Creating {} scorer (model dir: {:?})", backend, model_dir);

        match backend {
            ScorerBackend::Clip => Ok(Box::new(super::clip::ClipScorer::load(
                &config.scorer.clip,
                &model_dir.join(&config.scorer.clip.model),
            )?)),
            ScorerBackend::Tagger => Ok(Box::new(super::tagger::TaggerScorer::load(
                &config.scorer.tagger,
                &model_dir.join(&config.scorer.tagger.model),
            )?)),
            ScorerBackend::Remote => {
                let api_key = resolve_env_var(&config.scorer.remote.api_key);
                if api_key.is_none() && !config.scorer.remote.api_key.is_empty() {
                    tracing::warn!(
                        "Remote scorer key '{}' is not set; sending unauthenticated requests",
                        config.scorer.remote.api_key
                    );
                }
                Ok(Box::new(super::remote::RemoteScorer::new(
                    &config.scorer.remote.endpoint,
                    api_key,
                    config.limits.scorer_timeout_ms,
                )?))
            }
        }
    }

    /// Whether the model files for a local backend are present.
    ///
    /// Always true for the remote backend.
    pub fn model_exists(backend: ScorerBackend, config: &Config) -> bool {
        let model_dir = config.model_dir();
        match backend {
            ScorerBackend::Clip => {
                super::clip::ClipScorer::model_exists(&model_dir.join(&config.scorer.clip.model))
            }
            ScorerBackend::Tagger => super::tagger::TaggerScorer::model_exists(
                &model_dir.join(&config.scorer.tagger.model),
            ),
            ScorerBackend::Remote => true,
        }
    }
}

/// Fail with a `Model` error if a required file is absent.
pub(crate) fn require_file(path: &Path, what: &str) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::Model {
            message: format!(
                "{what} not found at {:?}. Run `vista models download` first.",
                path
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_local_backend_without_models_fails_with_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.model_dir = dir.path().to_path_buf();

        for backend in [ScorerBackend::Clip, ScorerBackend::Tagger] {
            assert!(!ScorerFactory::model_exists(backend, &config));
            match ScorerFactory::create_backend(backend, &config) {
                Err(PipelineError::Model { message }) => {
                    assert!(message.contains("vista models download"), "{message}")
                }
                Err(other) => panic!("expected Model error, got {other:?}"),
                Ok(_) => panic!("expected Model error for {backend}"),
            }
        }
    }

    #[test]
    fn test_remote_backend_builds_without_models() {
        let mut config = Config::default();
        config.scorer.backend = ScorerBackend::Remote;
        config.scorer.remote.endpoint = "http://127.0.0.1:9/classify".to_string();
        config.scorer.remote.api_key = String::new();

        assert!(ScorerFactory::model_exists(ScorerBackend::Remote, &config));
        let scorer = ScorerFactory::create(&config).unwrap();
        assert_eq!(scorer.name(), "remote");
    }
}
