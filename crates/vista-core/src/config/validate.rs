//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, ScorerBackend};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.scorer_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.scorer_timeout_ms must be > 0".into(),
            ));
        }
        if self.tagging.max_tags == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.max_tags must be >= 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tagging.min_confidence) {
            return Err(ConfigError::ValidationError(
                "tagging.min_confidence must be between 0.0 and 1.0".into(),
            ));
        }
        if self.scorer.clip.image_size == 0 || self.scorer.tagger.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "scorer image_size must be > 0".into(),
            ));
        }
        if !self.scorer.clip.prompt_template.contains("{term}") {
            return Err(ConfigError::ValidationError(
                "scorer.clip.prompt_template must contain {term}".into(),
            ));
        }
        if self.scorer.backend == ScorerBackend::Clip
            && self.scorer.clip.vocabulary_file.is_none()
            && self.scorer.clip.terms.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "scorer.clip.terms must not be empty".into(),
            ));
        }
        if self.scorer.backend == ScorerBackend::Remote && self.scorer.remote.endpoint.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "scorer.remote.endpoint must be set for the remote backend".into(),
            ));
        }
        if self.index.id_column.is_empty() || self.index.tags_column.is_empty() {
            return Err(ConfigError::ValidationError(
                "index.id_column and index.tags_column must be non-empty".into(),
            ));
        }
        Ok(())
    }
}
