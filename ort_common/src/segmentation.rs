//! YOLOv8-seg instance segmentation: boxes plus per-instance masks.

use std::path::Path;

use fashion_common::detection::{BackendKind, DetectionBackend, Mask, RawDetection};
use image::RgbImage;
use ndarray::CowArray;
use ort::session::Session;
use ort::value::TensorRef;

use crate::backend::DetectorOptions;
use crate::nms::{self, Proposal};
use crate::preprocess::{self, InputScale};
use crate::yolo::{decode_predictions, head_dims, load_session, to_raw_detection};

/// Instances with fewer mask pixels are dropped.
pub const MIN_MASK_PIXELS: usize = 100;
const MASK_THRESHOLD: f32 = 0.5;

/// Mask prototypes, `[channels, height, width]` row-major.
pub struct Prototypes<'a> {
    pub data: &'a [f32],
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl<'a> Prototypes<'a> {
    fn from_shape(shape: &[i64], data: &'a [f32]) -> anyhow::Result<Self> {
        match shape {
            [1, c, h, w] if *c > 0 && *h > 0 && *w > 0 => {
                let (channels, height, width) = (*c as usize, *h as usize, *w as usize);
                anyhow::ensure!(
                    data.len() >= channels * height * width,
                    "Prototype buffer too short for {shape:?}"
                );
                Ok(Self {
                    data,
                    channels,
                    height,
                    width,
                })
            }
            _ => anyhow::bail!("Unexpected prototype shape {shape:?}"),
        }
    }

    fn logit(&self, coeffs: &[f32], px: usize, py: usize) -> f32 {
        let plane = self.height * self.width;
        coeffs
            .iter()
            .take(self.channels)
            .enumerate()
            .map(|(k, c)| c * self.data[k * plane + py * self.width + px])
            .sum()
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Builds an image-sized mask from prototype coefficients.
///
/// Each image pixel samples the nearest prototype cell; only pixels inside
/// `bbox` (image coordinates, `[x1, y1, x2, y2]`) can be set.
pub fn assemble_mask(
    coeffs: &[f32],
    protos: &Prototypes<'_>,
    bbox: [f32; 4],
    image_width: u32,
    image_height: u32,
) -> Mask {
    let sx = protos.width as f32 / image_width.max(1) as f32;
    let sy = protos.height as f32 / image_height.max(1) as f32;
    Mask::from_fn(image_width, image_height, |x, y| {
        let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
        if fx < bbox[0] || fx > bbox[2] || fy < bbox[1] || fy > bbox[3] {
            return false;
        }
        let px = ((fx * sx) as usize).min(protos.width - 1);
        let py = ((fy * sy) as usize).min(protos.height - 1);
        sigmoid(protos.logit(coeffs, px, py)) > MASK_THRESHOLD
    })
}

pub struct SegmentationDetector {
    session: Session,
    options: DetectorOptions,
}

impl SegmentationDetector {
    pub fn load(path: &Path, options: DetectorOptions) -> anyhow::Result<Self> {
        let session = load_session(path)?;
        log::info!("Loaded segmentation model {path:?}");
        Ok(Self { session, options })
    }
}

impl DetectionBackend for SegmentationDetector {
    fn kind(&self) -> BackendKind {
        BackendKind::Segmentation
    }

    fn detect(&mut self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
        let (width, height) = image.dimensions();
        let input = preprocess::image_to_array(image, self.options.input_size);
        let input_dyn = CowArray::from(input).into_dyn();
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(&input_dyn)?])?;
        anyhow::ensure!(outputs.len() >= 2, "Model has no mask prototype output");

        let (head_shape, head) = outputs[0].try_extract_tensor::<f32>()?;
        let (proto_shape, proto_data) = outputs[1].try_extract_tensor::<f32>()?;
        let (features, anchors) = head_dims(head_shape)?;
        let protos = Prototypes::from_shape(proto_shape, proto_data)?;
        anyhow::ensure!(
            features > 4 + protos.channels,
            "Head with {features} features cannot hold {} mask coefficients",
            protos.channels
        );

        let num_classes = features - 4 - protos.channels;
        let proposals: Vec<Proposal> = nms::non_max_suppression(
            decode_predictions(
                head,
                features,
                anchors,
                num_classes,
                self.options.confidence_threshold,
            ),
            self.options.iou_threshold,
        );
        let scale = InputScale::new(width, height, self.options.input_size);

        let mut detections = Vec::new();
        for proposal in &proposals {
            let Some(det) = to_raw_detection(proposal, scale, (width, height), &self.options)
            else {
                continue;
            };
            let mask = assemble_mask(
                &proposal.mask_coeffs,
                &protos,
                scale.apply(proposal.bbox),
                width,
                height,
            );
            if mask.count() < MIN_MASK_PIXELS {
                log::debug!("Dropping {:?}, mask has {} pixels", det.label, mask.count());
                continue;
            }
            detections.push(det.with_mask(mask));
        }
        log::debug!("Segmentation kept {} detections", detections.len());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One channel, 2x2 grid: positive on the left column, negative on the right.
    const PROTO: [f32; 4] = [4.0, -4.0, 4.0, -4.0];

    fn protos() -> Prototypes<'static> {
        Prototypes {
            data: &PROTO,
            channels: 1,
            height: 2,
            width: 2,
        }
    }

    #[test]
    fn mask_follows_prototype_sign() {
        let mask = assemble_mask(&[1.0], &protos(), [0.0, 0.0, 20.0, 20.0], 20, 20);
        assert_eq!(mask.count(), 200);
        assert!(mask.get(3, 15));
        assert!(!mask.get(15, 3));

        let inverted = assemble_mask(&[-1.0], &protos(), [0.0, 0.0, 20.0, 20.0], 20, 20);
        assert!(inverted.get(15, 3));
    }

    #[test]
    fn mask_is_limited_to_the_box() {
        let mask = assemble_mask(&[1.0], &protos(), [0.0, 0.0, 5.0, 20.0], 20, 20);
        assert_eq!(mask.count(), 100);
        assert!(!mask.get(7, 0));
    }

    #[test]
    fn prototype_shape_is_validated() {
        let data = [0.0; 8];
        assert!(Prototypes::from_shape(&[1, 2, 2, 2], &data).is_ok());
        assert!(Prototypes::from_shape(&[1, 2, 4, 4], &data).is_err());
        assert!(Prototypes::from_shape(&[2, 2, 2], &data).is_err());
    }
}
