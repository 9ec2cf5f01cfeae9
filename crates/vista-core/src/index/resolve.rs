//! Resolution of image identifiers to files under the image root.
//!
//! Failures here are display-level: the caller reports them and keeps the
//! current selection and session.

use std::path::{Component, Path, PathBuf};

use crate::error::PipelineError;
use crate::pipeline::{DecodedImage, ImageDecoder};

/// Maps identifiers to `{image_root}/{image_id}` and opens them.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    root: PathBuf,
    decoder: ImageDecoder,
}

impl ImageResolver {
    pub fn new(root: impl Into<PathBuf>, decoder: ImageDecoder) -> Self {
        Self {
            root: root.into(),
            decoder,
        }
    }

    /// The configured image root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an identifier resolves to.
    ///
    /// Identifiers must be relative and must not climb out of the root.
    pub fn resolve(&self, image_id: &str) -> Result<PathBuf, PipelineError> {
        let relative = Path::new(image_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if image_id.is_empty() || escapes {
            return Err(PipelineError::ImageResourceUnavailable {
                image_id: image_id.to_string(),
                path: relative.to_path_buf(),
                message: "identifier is not a relative path inside the image root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Whether the identifier resolves to an existing file.
    pub fn exists(&self, image_id: &str) -> bool {
        self.resolve(image_id).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Open and decode the image behind an identifier.
    ///
    /// Every failure is reported as `ImageResourceUnavailable`.
    pub async fn open(&self, image_id: &str) -> Result<DecodedImage, PipelineError> {
        let path = self.resolve(image_id)?;
        self.decoder
            .decode(&path)
            .await
            .map_err(|e| PipelineError::ImageResourceUnavailable {
                image_id: image_id.to_string(),
                path: path.clone(),
                message: e.to_string(),
            })
    }
}
