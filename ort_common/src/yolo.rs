//! YOLOv8 box detector.

use std::path::Path;

use anyhow::Context;
use fashion_common::detection::{BackendKind, BoundingBox, DetectionBackend, RawDetection};
use image::RgbImage;
use ndarray::CowArray;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use crate::backend::DetectorOptions;
use crate::nms::{self, Proposal};
use crate::preprocess::{self, InputScale};

pub(crate) fn load_session(path: &Path) -> anyhow::Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load model {path:?}"))?;
    log::debug!("{session:?}");
    Ok(session)
}

/// `(features, anchors)` of a `[1, features, anchors]` head.
pub(crate) fn head_dims(shape: &[i64]) -> anyhow::Result<(usize, usize)> {
    match shape {
        [1, features, anchors] if *features > 4 && *anchors > 0 => {
            Ok((*features as usize, *anchors as usize))
        }
        _ => anyhow::bail!("Unexpected detection head shape {shape:?}"),
    }
}

/// Decodes a feature-major YOLOv8 head.
///
/// Each anchor holds `cx, cy, w, h`, then `num_classes` scores, then any mask
/// coefficients. Anchors whose best score is below `conf_threshold` are dropped.
pub fn decode_predictions(
    data: &[f32],
    features: usize,
    anchors: usize,
    num_classes: usize,
    conf_threshold: f32,
) -> Vec<Proposal> {
    if features < 4 + num_classes || data.len() < features * anchors {
        log::warn!(
            "Detection head of {} values does not fit {features}x{anchors}",
            data.len()
        );
        return Vec::new();
    }
    let at = |feature: usize, anchor: usize| data[feature * anchors + anchor];
    let num_coeffs = features - 4 - num_classes;

    let mut proposals = Vec::new();
    for anchor in 0..anchors {
        let Some((class_id, confidence)) = (0..num_classes)
            .map(|c| (c, at(4 + c, anchor)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        if confidence < conf_threshold {
            continue;
        }

        let (cx, cy) = (at(0, anchor), at(1, anchor));
        let (w, h) = (at(2, anchor), at(3, anchor));
        proposals.push(Proposal {
            class_id,
            confidence,
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            mask_coeffs: (0..num_coeffs)
                .map(|k| at(4 + num_classes + k, anchor))
                .collect(),
        });
    }
    proposals
}

/// Proposal in input space to a detection clamped to the image.
pub(crate) fn to_raw_detection(
    proposal: &Proposal,
    scale: InputScale,
    (width, height): (u32, u32),
    options: &DetectorOptions,
) -> Option<RawDetection> {
    let [x1, y1, x2, y2] = scale.apply(proposal.bbox);
    let bbox = BoundingBox::from_xyxy(x1, y1, x2, y2, width, height)?;
    Some(RawDetection::new(
        options.class_name(proposal.class_id),
        proposal.confidence,
        bbox,
    ))
}

pub struct YoloDetector {
    session: Session,
    options: DetectorOptions,
}

impl YoloDetector {
    pub fn load(path: &Path, options: DetectorOptions) -> anyhow::Result<Self> {
        let session = load_session(path)?;
        log::info!("Loaded YOLO model {path:?}");
        Ok(Self { session, options })
    }

    fn infer(&mut self, image: &RgbImage) -> anyhow::Result<Vec<Proposal>> {
        let input = preprocess::image_to_array(image, self.options.input_size);
        let input_dyn = CowArray::from(input).into_dyn();
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(&input_dyn)?])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let (features, anchors) = head_dims(shape)?;
        Ok(decode_predictions(
            data,
            features,
            anchors,
            features - 4,
            self.options.confidence_threshold,
        ))
    }
}

impl DetectionBackend for YoloDetector {
    fn kind(&self) -> BackendKind {
        BackendKind::Yolo
    }

    fn detect(&mut self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>> {
        let proposals = nms::non_max_suppression(self.infer(image)?, self.options.iou_threshold);
        let scale = InputScale::new(image.width(), image.height(), self.options.input_size);

        let detections: Vec<RawDetection> = proposals
            .iter()
            .filter_map(|p| to_raw_detection(p, scale, image.dimensions(), &self.options))
            .collect();
        log::debug!("YOLO kept {} detections", detections.len());
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco_classes;

    /// Two anchors, two classes, laid out feature-major.
    fn head() -> Vec<f32> {
        vec![
            50.0, 300.0, // cx
            60.0, 300.0, // cy
            20.0, 100.0, // w
            40.0, 100.0, // h
            0.1, 0.2, // class 0
            0.8, 0.05, // class 1
        ]
    }

    #[test]
    fn decodes_boxes_above_threshold() {
        let proposals = decode_predictions(&head(), 6, 2, 2, 0.3);

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].class_id, 1);
        assert_eq!(proposals[0].confidence, 0.8);
        assert_eq!(proposals[0].bbox, [40.0, 40.0, 60.0, 80.0]);
        assert!(proposals[0].mask_coeffs.is_empty());
    }

    #[test]
    fn short_buffer_decodes_nothing() {
        assert!(decode_predictions(&[0.0; 5], 6, 2, 2, 0.3).is_empty());
    }

    #[test]
    fn rejects_unexpected_head_shapes() {
        assert_eq!(head_dims(&[1, 84, 8400]).unwrap(), (84, 8400));
        assert!(head_dims(&[84, 8400]).is_err());
        assert!(head_dims(&[2, 84, 8400]).is_err());
    }

    #[test]
    fn scaled_detection_uses_class_names() {
        let proposal = Proposal {
            class_id: 27,
            confidence: 0.9,
            bbox: [10.0, 10.0, 20.0, 30.0],
            mask_coeffs: Vec::new(),
        };
        let options = DetectorOptions {
            input_size: 100,
            ..DetectorOptions::default()
        };
        let scale = InputScale::new(200, 100, 100);

        let det = to_raw_detection(&proposal, scale, (200, 100), &options).unwrap();
        assert_eq!(det.label, coco_classes::name(27));
        assert_eq!((det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2), (20, 10, 40, 30));
    }
}
