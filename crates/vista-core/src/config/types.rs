//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.vista/models"),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Remote scorer call timeout in milliseconds
    pub scorer_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            scorer_timeout_ms: 60000,
        }
    }
}

/// Which label scorer implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerBackend {
    /// Fixed-vocabulary CLIP similarity scoring
    #[default]
    Clip,
    /// Open-vocabulary multi-label classifier (WD14 style)
    Tagger,
    /// Remote HTTP inference endpoint
    Remote,
}

impl std::fmt::Display for ScorerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerBackend::Clip => write!(f, "clip"),
            ScorerBackend::Tagger => write!(f, "tagger"),
            ScorerBackend::Remote => write!(f, "remote"),
        }
    }
}

/// Label scorer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Active backend
    pub backend: ScorerBackend,

    /// CLIP backend settings
    pub clip: ClipConfig,

    /// Multi-label tagger backend settings
    pub tagger: TaggerConfig,

    /// Remote backend settings
    pub remote: RemoteConfig,
}

/// The 16 scenic keywords the CLIP backend scores by default.
pub const SCENIC_KEYWORDS: &[&str] = &[
    "sky", "sea", "forest", "mountain", "city", "night", "sunset", "trees", "water", "street",
    "river", "building", "beach", "clouds", "sun", "lake",
];

/// How a CLIP cosine similarity becomes a confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calibration {
    /// Raw cosine similarity clamped to [0, 1]
    #[default]
    Cosine,
    /// `sigmoid(logit_scale * cosine + logit_bias)`
    Sigmoid,
}

/// CLIP similarity backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Model name; files live in `{model_dir}/{model}/`
    pub model: String,

    /// Image input size (square)
    pub image_size: u32,

    /// Prompt rendered for each term; `{term}` is replaced by the term
    pub prompt_template: String,

    /// Vocabulary terms, in scoring order
    pub terms: Vec<String>,

    /// Optional file with one term per line; replaces `terms` when set
    pub vocabulary_file: Option<String>,

    /// Cosine-to-confidence mapping
    pub calibration: Calibration,

    /// Sigmoid calibration scale
    pub logit_scale: f32,

    /// Sigmoid calibration bias
    pub logit_bias: f32,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-base-patch32".to_string(),
            image_size: 224,
            prompt_template: "{term}".to_string(),
            terms: SCENIC_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            vocabulary_file: None,
            calibration: Calibration::Cosine,
            logit_scale: 100.0,
            logit_bias: -25.0,
        }
    }
}

/// Multi-label tagger backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Model name; files live in `{model_dir}/{model}/`
    pub model: String,

    /// Image input size (square)
    pub image_size: u32,

    /// Optional file with one tag per line restricting the reported labels
    pub selected_tags_file: Option<String>,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            model: "wd-v1-4-convnextv2-tagger-v2".to_string(),
            image_size: 448,
            selected_tags_file: None,
        }
    }
}

/// Remote inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Endpoint URL receiving `{"inputs": "<base64>"}`
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax); empty for no auth
    pub api_key: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/google/vit-base-patch16-224"
                .to_string(),
            api_key: "${HF_API_TOKEN}".to_string(),
        }
    }
}

/// Tag extraction defaults used by the CLI when flags are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Minimum confidence threshold for tags
    pub min_confidence: f32,

    /// Maximum number of tags per image
    pub max_tags: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.25,
            max_tags: 5,
        }
    }
}

/// Reference image index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index table (CSV with a header row)
    pub path: String,

    /// Directory the image identifiers resolve against
    pub image_root: String,

    /// Header name of the image identifier column
    pub id_column: String,

    /// Header name of the delimited tags column
    pub tags_column: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: "data/image-tag.csv".to_string(),
            image_root: "data/images".to_string(),
            id_column: "image_name".to_string(),
            tags_column: "tags".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
