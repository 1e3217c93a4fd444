use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;

/// Maps model input coordinates back onto the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputScale {
    pub x: f32,
    pub y: f32,
}

impl InputScale {
    pub fn new(image_width: u32, image_height: u32, input_size: u32) -> Self {
        let input = input_size.max(1) as f32;
        Self {
            x: image_width as f32 / input,
            y: image_height as f32 / input,
        }
    }

    pub fn apply(&self, bbox: [f32; 4]) -> [f32; 4] {
        [
            bbox[0] * self.x,
            bbox[1] * self.y,
            bbox[2] * self.x,
            bbox[3] * self.y,
        ]
    }
}

/// Stretches the image to a square model input and lays it out as a
/// `(1, 3, size, size)` tensor scaled to `[0, 1]`.
pub fn image_to_array(image: &RgbImage, input_size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(image, input_size, input_size, FilterType::Triangle);
    let size = input_size as usize;

    let mut array = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        array[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        array[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        array[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }
    array
}
