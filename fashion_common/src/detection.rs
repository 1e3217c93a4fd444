//! Detection data model shared by every backend and the analysis pipeline.

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::attributes::FashionAttributes;
use crate::color::ColorSample;

/// Label the basic backend assigns to its single whole-frame detection.
pub const WHOLE_FRAME_LABEL: &str = "clothing_item";

/// Axis aligned box in integer pixel coordinates, `x2 > x1` and `y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Returns `None` for empty or inverted boxes.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Self> {
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self {
            x1,
            y1,
            x2,
            y2,
            width: x2 - x1,
            height: y2 - y1,
        })
    }

    /// Builds a box from float detector coordinates, clamped to the image.
    pub fn from_xyxy(
        xmin: f32,
        ymin: f32,
        xmax: f32,
        ymax: f32,
        img_width: u32,
        img_height: u32,
    ) -> Option<Self> {
        let x1 = xmin.max(0.0).min(img_width as f32) as u32;
        let y1 = ymin.max(0.0).min(img_height as f32) as u32;
        let x2 = xmax.max(0.0).min(img_width as f32) as u32;
        let y2 = ymax.max(0.0).min(img_height as f32) as u32;
        Self::new(x1, y1, x2, y2)
    }

    /// Box covering the whole image.
    pub fn full(img_width: u32, img_height: u32) -> Option<Self> {
        Self::new(0, 0, img_width, img_height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Clips the box to the image, dropping it if nothing remains.
    pub fn clamp_to(&self, img_width: u32, img_height: u32) -> Option<Self> {
        Self::new(
            self.x1.min(img_width),
            self.y1.min(img_height),
            self.x2.min(img_width),
            self.y2.min(img_height),
        )
    }
}

/// Per-pixel instance mask with the same dimensions as the analysed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&set| set).count()
    }

    /// `(height, width)` spanned by the set pixels, measured as `max - min`
    /// over rows and columns. `None` for an empty mask.
    pub fn extent(&self) -> Option<(u32, u32)> {
        let mut rows: Option<(u32, u32)> = None;
        let mut cols: Option<(u32, u32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.get(x, y) {
                    continue;
                }
                rows = Some(rows.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))));
                cols = Some(cols.map_or((x, x), |(lo, hi)| (lo.min(x), hi.max(x))));
            }
        }
        match (rows, cols) {
            (Some((top, bottom)), Some((left, right))) => Some((bottom - top, right - left)),
            _ => None,
        }
    }

    /// Pixels of `image` under the mask, in row-major order.
    pub fn select(&self, image: &RgbImage) -> Vec<[u8; 3]> {
        if image.dimensions() != (self.width, self.height) {
            log::warn!(
                "Mask {}x{} does not match image {:?}, ignoring",
                self.width,
                self.height,
                image.dimensions()
            );
            return Vec::new();
        }
        image
            .pixels()
            .zip(self.data.iter())
            .filter(|(_, &set)| set)
            .map(|(pixel, _)| pixel.0)
            .collect()
    }
}

/// Detector output consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub mask: Option<Mask>,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// A located clothing item with its colors and attributes.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    pub colors: Vec<ColorSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<FashionAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_area: Option<usize>,
    pub segmentation_available: bool,
    #[serde(skip)]
    pub mask: Option<Mask>,
}

/// Which detection capability was resolved at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Yolo,
    Segmentation,
    Basic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Yolo => "yolo",
            BackendKind::Segmentation => "segmentation",
            BackendKind::Basic => "basic",
        }
    }

    pub fn provides_masks(&self) -> bool {
        matches!(self, BackendKind::Segmentation)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A swappable object detector.
pub trait DetectionBackend: Send {
    fn kind(&self) -> BackendKind;

    fn detect(&mut self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>>;
}

/// Fallback used when no model could be loaded: one detection covering the frame.
#[derive(Debug, Default)]
pub struct BasicBackend;

impl DetectionBackend for BasicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Basic
    }

    fn detect(&mut self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
        let (width, height) = image.dimensions();
        Ok(BoundingBox::full(width, height)
            .map(|bbox| RawDetection::new(WHOLE_FRAME_LABEL, 0.5, bbox))
            .into_iter()
            .collect())
    }
}
