//! Image preprocessing for the ONNX scorer backends.
//!
//! CLIP expects:
//! - shortest side resized to `image_size`, then a centered square crop
//! - per-channel normalization with CLIP's mean/std
//! - RGB, NCHW `[1, 3, H, W]`
//!
//! WD14-style taggers expect:
//! - transparency flattened onto white
//! - the image padded to a white square, then resized to `image_size`
//! - raw 0–255 floats in BGR order, NHWC `[1, H, W, 3]`

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Number of color channels.
const CHANNELS: usize = 3;

/// CLIP normalization mean (per RGB channel).
const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per RGB channel).
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for the CLIP visual encoder.
pub fn preprocess_clip(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let scale = image_size as f32 / w.min(h).max(1) as f32;
    let new_w = ((w as f32 * scale).round() as u32).max(image_size);
    let new_h = ((h as f32 * scale).round() as u32).max(image_size);

    let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom);
    let left = (new_w - image_size) / 2;
    let top = (new_h - image_size) / 2;
    let rgb = resized.crop_imm(left, top, image_size, image_size).to_rgb8();

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..CHANNELS {
            let v = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (v - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    tensor
}

/// Composite any alpha channel onto a white background.
fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Preprocess an image for a WD14-style multi-label tagger.
pub fn preprocess_tagger(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let rgb = flatten_on_white(image);
    let (w, h) = rgb.dimensions();
    let side = w.max(h);

    let mut square = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));
    image::imageops::overlay(
        &mut square,
        &rgb,
        ((side - w) / 2) as i64,
        ((side - h) / 2) as i64,
    );
    let resized = image::imageops::resize(&square, image_size, image_size, FilterType::CatmullRom);

    let size = image_size as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, CHANNELS));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        tensor[[0, y as usize, x as usize, 0]] = b as f32;
        tensor[[0, y as usize, x as usize, 1]] = g as f32;
        tensor[[0, y as usize, x as usize, 2]] = r as f32;
    }
    tensor
}
