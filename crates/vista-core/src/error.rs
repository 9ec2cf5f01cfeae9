//! Error types for the Vista tagging and matching pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, image identifiers, index lines).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Vista operations.
#[derive(Error, Debug)]
pub enum VistaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed.
    ///
    /// `ImageTagger::tag_path` reports this (and `UnsupportedFormat`) for its
    /// input as `ScoringFailure`; reference images keep it, wrapped in
    /// `ImageResourceUnavailable`.
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Model files could not be loaded or initialized
    #[error("Model error: {message}")]
    Model { message: String },

    /// The label scorer could not produce scores for an image.
    ///
    /// Fatal for the current request. Never retried: a remote classifier may
    /// answer differently on a second attempt.
    #[error("Scoring failed ({backend}): {message}")]
    ScoringFailure {
        backend: String,
        message: String,
        /// HTTP status for remote backends, when one was received
        status_code: Option<u16>,
    },

    /// A row of the index table is missing a required field
    #[error("Malformed index row at line {line}: {message}")]
    MalformedIndexRow { line: usize, message: String },

    /// Lookup of an image identifier that is not in the index
    #[error("Image not in index: {0}")]
    UnknownImage(String),

    /// A reference image could not be opened for display
    #[error("Failed to open image '{image_id}' at {path}: {message}")]
    ImageResourceUnavailable {
        image_id: String,
        path: PathBuf,
        message: String,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Build a scoring failure without an HTTP status.
    pub fn scoring(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ScoringFailure {
            backend: backend.into(),
            message: message.into(),
            status_code: None,
        }
    }
}

/// Convenience type alias for Vista results.
pub type Result<T> = std::result::Result<T, VistaError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
