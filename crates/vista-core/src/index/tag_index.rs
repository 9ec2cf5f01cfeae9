//! In-memory map from reference image identifiers to their tag sets.
//!
//! Built once from the persisted table and read-only afterwards, so a single
//! `Arc<TagIndex>` can serve every session without locking.

use std::collections::{BTreeMap, HashSet};

use crate::error::PipelineError;

/// Delimiter between tags inside the tags field.
pub const TAG_DELIMITER: char = ';';

/// Unordered, duplicate-free set of tags belonging to one image.
pub type TagSet = HashSet<String>;

/// One raw row of the index table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    /// 1-based line number in the source, for error reporting
    pub line: usize,
    /// Image identifier (file name relative to the image root)
    pub image_id: String,
    /// Unparsed, delimited tags field
    pub tags: String,
}

impl IndexRow {
    pub fn new(line: usize, image_id: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            line,
            image_id: image_id.into(),
            tags: tags.into(),
        }
    }
}

/// Split a delimited tags field: trim each token and drop empty ones.
pub fn parse_tags(field: &str) -> TagSet {
    field
        .split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reference image identifier → tag set.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    entries: BTreeMap<String, TagSet>,
}

impl TagIndex {
    /// Build the index from raw rows.
    ///
    /// Fails on the first row without an image identifier; a partially loaded
    /// index is never returned. Rows whose tags field is empty are kept with an
    /// empty set. A repeated identifier replaces the earlier row.
    pub fn build<I>(rows: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = IndexRow>,
    {
        let mut entries = BTreeMap::new();
        let mut untagged = 0usize;

        for row in rows {
            let image_id = row.image_id.trim();
            if image_id.is_empty() {
                return Err(PipelineError::MalformedIndexRow {
                    line: row.line,
                    message: "missing image identifier".to_string(),
                });
            }

            let tags = parse_tags(&row.tags);
            if tags.is_empty() {
                untagged += 1;
            }

            if entries.insert(image_id.to_string(), tags).is_some() {
                tracing::warn!(
                    "Duplicate image '{}' at line {}; later row replaces earlier one",
                    image_id,
                    row.line
                );
            }
        }

        tracing::debug!(
            "Built tag index: {} images ({} without tags)",
            entries.len(),
            untagged
        );

        Ok(Self { entries })
    }

    /// Tags of an indexed image.
    ///
    /// Asking for an identifier that is not indexed is a caller error.
    pub fn tags_of(&self, image_id: &str) -> Result<&TagSet, PipelineError> {
        self.entries
            .get(image_id)
            .ok_or_else(|| PipelineError::UnknownImage(image_id.to_string()))
    }

    /// Whether the identifier is indexed.
    pub fn contains(&self, image_id: &str) -> bool {
        self.entries.contains_key(image_id)
    }

    /// Iterate over `(image_id, tags)` in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagSet)> {
        self.entries.iter().map(|(id, tags)| (id.as_str(), tags))
    }

    /// Iterate over indexed identifiers in order.
    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of indexed images.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no images.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
