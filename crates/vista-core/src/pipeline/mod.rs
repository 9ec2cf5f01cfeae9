//! Image input stages shared by the scorer and the resolver.
//!
//! - **decode**: Load and decode images with format detection, limits and timeout
//! - **processor**: Decode → score → extract for one input image

pub mod decode;
pub mod processor;

pub use decode::{DecodedImage, ImageDecoder};
pub use processor::ImageTagger;
