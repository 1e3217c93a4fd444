//! Pixel region helpers: crops, downscaling and person box splitting.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::detection::BoundingBox;

/// Fifths of a person box height covered by each of the upper and lower regions.
const PERSON_SPLIT_FIFTHS: u32 = 3;

/// Copies the part of `image` inside `bbox`. `None` if the box lies outside.
pub fn crop(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (img_width, img_height) = image.dimensions();
    let clamped = bbox.clamp_to(img_width, img_height)?;
    Some(imageops::crop_imm(image, clamped.x1, clamped.y1, clamped.width, clamped.height).to_image())
}

/// Shrinks `image` so its longer side is at most `max_side`, keeping aspect ratio.
pub fn downscale(image: &RgbImage, max_side: u32) -> Cow<'_, RgbImage> {
    let (width, height) = image.dimensions();
    if max_side == 0 || (width <= max_side && height <= max_side) {
        return Cow::Borrowed(image);
    }
    let scale = (max_side as f32 / width as f32).min(max_side as f32 / height as f32);
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);
    Cow::Owned(imageops::resize(image, new_width, new_height, FilterType::Triangle))
}

/// All pixels in row-major order.
pub fn image_pixels(image: &RgbImage) -> Vec<[u8; 3]> {
    image.pixels().map(|p| p.0).collect()
}

/// Upper and lower body regions of a person box.
///
/// The upper region is the top 60% of the box and the lower region the bottom
/// 60%, so they overlap between 40% and 60% of the height.
pub fn split_person(bbox: &BoundingBox) -> (Option<BoundingBox>, Option<BoundingBox>) {
    let upper_end = bbox.y1 + bbox.height * PERSON_SPLIT_FIFTHS / 5;
    let lower_start = bbox.y1 + bbox.height * (5 - PERSON_SPLIT_FIFTHS) / 5;
    let upper = BoundingBox::new(bbox.x1, bbox.y1, bbox.x2, upper_end);
    let lower = BoundingBox::new(bbox.x1, lower_start, bbox.x2, bbox.y2);
    (upper, lower)
}
