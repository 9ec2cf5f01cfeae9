//! Label vocabularies for the fixed-vocabulary scorer.
//!
//! Terms come either from config or from a plain text file with one term per
//! line. Blank lines and `#` comments are skipped; duplicates keep their first
//! position.

use std::collections::HashSet;
use std::path::Path;

use crate::config::ClipConfig;
use crate::error::PipelineError;

/// An ordered, de-duplicated list of label terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    /// Build from an iterator of terms, trimming and dropping duplicates.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();
        Self { terms }
    }

    /// Parse the one-term-per-line format.
    pub fn parse(content: &str) -> Self {
        Self::from_terms(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    /// Load a one-term-per-line file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Model {
            message: format!("Failed to read vocabulary {:?}: {}", path, e),
        })?;
        Ok(Self::parse(&content))
    }

    /// The vocabulary a CLIP scorer should use: the file when configured,
    /// otherwise the inline `terms`.
    pub fn from_config(config: &ClipConfig) -> Result<Self, PipelineError> {
        let vocab = match &config.vocabulary_file {
            Some(file) => Self::load(&crate::config::expand(file))?,
            None => Self::from_terms(&config.terms),
        };

        if vocab.is_empty() {
            return Err(PipelineError::Model {
                message: "CLIP vocabulary is empty".to_string(),
            });
        }

        tracing::info!("Loaded vocabulary: {} terms", vocab.len());
        Ok(vocab)
    }

    /// Terms in scoring order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Render every term through a prompt template containing `{term}`.
    pub fn prompts(&self, template: &str) -> Vec<String> {
        self.terms
            .iter()
            .map(|t| template.replace("{term}", t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SCENIC_KEYWORDS;
    use std::io::Write;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let vocab = Vocabulary::parse("# scenic\nsky\n\n  sea  \n#forest\nsky\n");
        assert_eq!(vocab.terms(), &["sky", "sea"]);
    }

    #[test]
    fn test_default_config_is_scenic_keywords() {
        let vocab = Vocabulary::from_config(&ClipConfig::default()).unwrap();
        assert_eq!(vocab.len(), 16);
        assert_eq!(vocab.terms()[0], SCENIC_KEYWORDS[0]);
    }

    #[test]
    fn test_file_replaces_inline_terms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "glacier\ndesert").unwrap();

        let config = ClipConfig {
            vocabulary_file: Some(path.to_string_lossy().into_owned()),
            ..ClipConfig::default()
        };
        let vocab = Vocabulary::from_config(&config).unwrap();
        assert_eq!(vocab.terms(), &["glacier", "desert"]);
    }

    #[test]
    fn test_empty_vocabulary_is_rejected() {
        let config = ClipConfig {
            terms: vec!["  ".to_string()],
            ..ClipConfig::default()
        };
        assert!(Vocabulary::from_config(&config).is_err());
    }

    #[test]
    fn test_prompts() {
        let vocab = Vocabulary::from_terms(["sky", "lake"]);
        assert_eq!(
            vocab.prompts("a photo of a {term}"),
            vec!["a photo of a sky", "a photo of a lake"]
        );
        assert_eq!(vocab.prompts("{term}"), vec!["sky", "lake"]);
    }
}
