//! The reference image index: tag sets per image, the table they are read
//! from, and resolution of identifiers to image files.

pub mod resolve;
pub mod source;
pub mod tag_index;

pub use resolve::ImageResolver;
pub use source::IndexSource;
pub use tag_index::{parse_tags, IndexRow, TagIndex, TagSet, TAG_DELIMITER};
