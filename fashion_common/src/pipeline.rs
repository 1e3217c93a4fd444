//! Turns raw detector output into analysed clothing items.
//!
//! Two flows are supported. [`FashionAnalyzer::detect_items`] analyses every
//! detection in one go. [`FashionAnalyzer::analyze`] is the first half of the
//! two-phase flow: with more than one candidate it only lists them, and the
//! caller picks one with [`FashionAnalyzer::analyze_selected`].

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

use crate::attributes::{basic_attributes, infer_attributes, FashionAttributes, MaskEvidence};
use crate::color::naming::ColorNaming;
use crate::color::{self, ColorAnalysisConfig, ColorSample};
use crate::detection::{BoundingBox, Detection, Mask, RawDetection, WHOLE_FRAME_LABEL};
use crate::region;
use crate::taxonomy::{self, ClothingType, StyleCategory};

const PERSON_LABEL: &str = "person";
const UPPER_BODY_LABEL: &str = "shirt";
const LOWER_BODY_LABEL: &str = "pants";
const WHOLE_IMAGE_LABEL: &str = "whole_image_analysis";

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Detections at or below this confidence are ignored.
    pub min_confidence: f32,
    /// Candidates for selection need both sides at least this long.
    pub min_candidate_side: u32,
    /// Masks with fewer set pixels are ignored.
    pub min_mask_area: usize,
    /// Confidence multiplier for regions derived from a person box.
    pub person_split_factor: f32,
    pub region_colors: ColorAnalysisConfig,
    pub masked_colors: ColorAnalysisConfig,
    pub item_colors: ColorAnalysisConfig,
    /// Whole-photo colors when the caller asks for a quick answer.
    pub quick_colors: ColorAnalysisConfig,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            min_candidate_side: 30,
            min_mask_area: 100,
            person_split_factor: 0.8,
            region_colors: ColorAnalysisConfig::region(),
            masked_colors: ColorAnalysisConfig::masked(),
            item_colors: ColorAnalysisConfig::whole_image(),
            quick_colors: ColorAnalysisConfig::fast(),
        }
    }
}

impl AnalyzerSettings {
    /// Mobile profile: every color analysis uses the fast preset.
    pub fn fast() -> Self {
        Self {
            region_colors: ColorAnalysisConfig::fast(),
            masked_colors: ColorAnalysisConfig::fast(),
            item_colors: ColorAnalysisConfig::fast(),
            ..Self::default()
        }
    }

    pub fn with_naming(mut self, naming: ColorNaming) -> Self {
        for config in [
            &mut self.region_colors,
            &mut self.masked_colors,
            &mut self.item_colors,
            &mut self.quick_colors,
        ] {
            config.naming = naming;
        }
        self
    }
}

/// An item offered to the caller for selection.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    /// 1-based position in the candidate list.
    pub id: usize,
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
    pub mask: Option<Mask>,
    /// Derived from a person box rather than detected directly.
    pub from_person: bool,
}

impl CandidateItem {
    pub fn description(&self) -> String {
        format!("{} (confidence: {:.1}%)", self.label, self.confidence * 100.0)
    }

    pub fn descriptor(&self) -> CandidateDescriptor {
        CandidateDescriptor {
            id: self.id,
            description: self.description(),
        }
    }
}

/// Public view of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateDescriptor {
    pub id: usize,
    pub description: String,
}

/// Full analysis of a single item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalysis {
    pub clothing_type: ClothingType,
    pub detected_as: String,
    pub confidence: f32,
    pub applicable_styles: Vec<StyleCategory>,
    pub colors: Vec<ColorSample>,
    pub color_description: String,
    pub attributes: FashionAttributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FashionOutcome {
    /// More than one candidate; nothing was analysed yet.
    MultipleItems(Vec<CandidateItem>),
    Single(ItemAnalysis),
    /// Nothing was detected, the whole photo was analysed instead.
    WholeImage(ItemAnalysis),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid item selection: {requested} (choose 1 to {available})")]
    OutOfRange { requested: usize, available: usize },
}

#[derive(Debug, Clone, Default)]
pub struct FashionAnalyzer {
    settings: AnalyzerSettings,
}

impl FashionAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Self {
        Self { settings }
    }

    /// Dominant colors of a whole photo.
    pub fn dominant_colors(&self, image: &RgbImage, quick: bool) -> Vec<ColorSample> {
        let config = if quick {
            &self.settings.quick_colors
        } else {
            &self.settings.item_colors
        };
        color::analyze_image(image, config)
    }

    fn is_person(&self, raw: &RawDetection) -> bool {
        raw.label == PERSON_LABEL && raw.confidence > self.settings.min_confidence
    }

    /// Colors, attributes and masks for every clothing detection.
    ///
    /// People are not reported themselves. When no clothing item survives,
    /// each person box is split into a `shirt` and a `pants` region instead.
    pub fn detect_items(&self, image: &RgbImage, raw: Vec<RawDetection>) -> Vec<Detection> {
        let mut persons = Vec::new();
        let mut items = Vec::new();

        for det in raw {
            if det.label == PERSON_LABEL {
                if self.is_person(&det) {
                    persons.push(det);
                }
                continue;
            }
            if det.confidence <= self.settings.min_confidence {
                continue;
            }
            if det.label == WHOLE_FRAME_LABEL {
                let colors = color::analyze_box(image, &det.bbox, &self.settings.region_colors);
                let attributes = basic_attributes(&det.label, &colors);
                items.push(into_detection(det, colors, attributes));
                continue;
            }
            if !taxonomy::is_fashion_item(&det.label) {
                log::debug!("Skipping non-fashion detection {:?}", det.label);
                continue;
            }
            if let Some(item) = self.analyze_detection(image, det) {
                items.push(item);
            }
        }

        if items.is_empty() && !persons.is_empty() {
            log::info!(
                "No clothing items detected, splitting {} person box(es)",
                persons.len()
            );
            for person in &persons {
                for part in self.split_person(person) {
                    let colors =
                        color::analyze_box(image, &part.bbox, &self.settings.region_colors);
                    if colors.is_empty() {
                        continue;
                    }
                    let attributes = basic_attributes(&part.label, &colors);
                    items.push(into_detection(part, colors, attributes));
                }
            }
        }
        items
    }

    fn analyze_detection(&self, image: &RgbImage, det: RawDetection) -> Option<Detection> {
        match &det.mask {
            Some(mask) => {
                let area = mask.count();
                if area < self.settings.min_mask_area {
                    log::debug!("Skipping {:?}, mask area {area} too small", det.label);
                    return None;
                }
                let colors = color::analyze_masked(image, mask, &self.settings.masked_colors);
                let attributes =
                    infer_attributes(&det.label, &colors, Some(MaskEvidence::new(image, mask)));
                let mut detection = into_detection(det, colors, attributes);
                detection.mask_area = Some(area);
                Some(detection)
            }
            None => {
                let colors = color::analyze_box(image, &det.bbox, &self.settings.region_colors);
                let attributes = infer_attributes(&det.label, &colors, None);
                Some(into_detection(det, colors, attributes))
            }
        }
    }

    /// Upper and lower body regions of a person, labelled `shirt` and `pants`.
    fn split_person(&self, person: &RawDetection) -> Vec<RawDetection> {
        let confidence = person.confidence * self.settings.person_split_factor;
        let (upper, lower) = region::split_person(&person.bbox);
        [(upper, UPPER_BODY_LABEL), (lower, LOWER_BODY_LABEL)]
            .into_iter()
            .filter_map(|(bbox, label)| bbox.map(|bbox| RawDetection::new(label, confidence, bbox)))
            .collect()
    }

    /// Items eligible for the select-one flow, numbered from 1.
    pub fn collect_candidates(&self, raw: Vec<RawDetection>) -> Vec<CandidateItem> {
        let min_side = self.settings.min_candidate_side;
        let mut persons = Vec::new();
        let mut picked = Vec::new();

        for det in raw {
            if det.label == PERSON_LABEL {
                if self.is_person(&det) {
                    persons.push(det);
                }
                continue;
            }
            if det.confidence <= self.settings.min_confidence
                || !taxonomy::is_fashion_item(&det.label)
            {
                continue;
            }
            if det.bbox.width < min_side || det.bbox.height < min_side {
                log::debug!("Skipping small {:?} box {:?}", det.label, det.bbox);
                continue;
            }
            picked.push((det, false));
        }

        if picked.is_empty() {
            for person in &persons {
                picked.extend(self.split_person(person).into_iter().map(|part| (part, true)));
            }
        }

        picked
            .into_iter()
            .enumerate()
            .map(|(i, (det, from_person))| CandidateItem {
                id: i + 1,
                label: det.label,
                confidence: det.confidence,
                bounding_box: det.bbox,
                mask: det.mask,
                from_person,
            })
            .collect()
    }

    /// First phase of the two-phase flow.
    pub fn analyze(&self, image: &RgbImage, raw: Vec<RawDetection>) -> FashionOutcome {
        let mut candidates = self.collect_candidates(raw);
        match candidates.len() {
            0 => FashionOutcome::WholeImage(self.analyze_whole_image(image)),
            1 => {
                let item = candidates.remove(0);
                FashionOutcome::Single(self.analyze_candidate(image, &item))
            }
            n => {
                log::info!("{n} candidate items, asking for a selection");
                FashionOutcome::MultipleItems(candidates)
            }
        }
    }

    /// Second phase: analyse the `item_id`-th (1-based) candidate.
    pub fn analyze_selected(
        &self,
        image: &RgbImage,
        item_id: usize,
        candidates: &[CandidateItem],
    ) -> Result<ItemAnalysis, SelectionError> {
        let item = item_id
            .checked_sub(1)
            .and_then(|idx| candidates.get(idx))
            .ok_or(SelectionError::OutOfRange {
                requested: item_id,
                available: candidates.len(),
            })?;
        Ok(self.analyze_candidate(image, item))
    }

    pub fn analyze_candidate(&self, image: &RgbImage, item: &CandidateItem) -> ItemAnalysis {
        let colors = match &item.mask {
            Some(mask) => color::analyze_masked(image, mask, &self.settings.masked_colors),
            None => color::analyze_box(image, &item.bounding_box, &self.settings.item_colors),
        };
        let attributes = if item.from_person {
            basic_attributes(&item.label, &colors)
        } else {
            let evidence = item.mask.as_ref().map(|mask| MaskEvidence::new(image, mask));
            infer_attributes(&item.label, &colors, evidence)
        };
        let clothing_type = taxonomy::normalize_clothing_type(&item.label);
        ItemAnalysis {
            applicable_styles: taxonomy::applicable_styles(&clothing_type),
            clothing_type,
            detected_as: item.label.clone(),
            confidence: item.confidence,
            color_description: color::describe_colors(&colors),
            colors,
            attributes,
            bounding_box: Some(item.bounding_box),
            note: None,
        }
    }

    /// Fallback when no item was detected: colors of the whole photo and a
    /// type guessed from its proportions.
    pub fn analyze_whole_image(&self, image: &RgbImage) -> ItemAnalysis {
        let (width, height) = image.dimensions();
        let colors = self.dominant_colors(image, false);
        let clothing_type = taxonomy::infer_type_from_shape(width, height);
        let attributes = infer_attributes(clothing_type.as_str(), &colors, None);
        ItemAnalysis {
            applicable_styles: taxonomy::applicable_styles(&clothing_type),
            clothing_type,
            detected_as: WHOLE_IMAGE_LABEL.to_string(),
            confidence: 0.5,
            color_description: color::describe_colors(&colors),
            colors,
            attributes,
            bounding_box: None,
            note: Some(
                "Analysis based on whole image as no specific clothing items were detected"
                    .to_string(),
            ),
        }
    }
}

fn into_detection(
    det: RawDetection,
    colors: Vec<ColorSample>,
    attributes: FashionAttributes,
) -> Detection {
    Detection {
        segmentation_available: det.mask.is_some(),
        mask_area: None,
        label: det.label,
        confidence: det.confidence,
        bounding_box: det.bbox,
        colors,
        attributes: Some(attributes),
        mask: det.mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::DetectionMethod;
    use image::Rgb;

    /// Red top half, blue bottom half.
    fn outfit_image() -> RgbImage {
        RgbImage::from_fn(100, 200, |_, y| {
            if y < 100 {
                Rgb([220, 20, 20])
            } else {
                Rgb([20, 20, 200])
            }
        })
    }

    fn raw(label: &str, confidence: f32, x1: u32, y1: u32, x2: u32, y2: u32) -> RawDetection {
        RawDetection::new(label, confidence, BoundingBox::new(x1, y1, x2, y2).unwrap())
    }

    #[test]
    fn person_only_is_split_into_shirt_and_pants() {
        let analyzer = FashionAnalyzer::default();
        let items = analyzer.detect_items(&outfit_image(), vec![raw("person", 0.9, 0, 0, 100, 200)]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "shirt");
        assert_eq!(items[1].label, "pants");
        assert!((items[0].confidence - 0.72).abs() < 1e-6);
        assert_eq!((items[0].bounding_box.y1, items[0].bounding_box.y2), (0, 120));
        assert_eq!((items[1].bounding_box.y1, items[1].bounding_box.y2), (80, 200));
        assert_eq!(items[0].colors[0].name, "crimson");
        assert_eq!(items[1].colors[0].name, "mediumblue");
        let attrs = items[0].attributes.as_ref().unwrap();
        assert_eq!(attrs.detection_method, DetectionMethod::Basic);
    }

    #[test]
    fn clothing_items_suppress_person_split() {
        let analyzer = FashionAnalyzer::default();
        let items = analyzer.detect_items(
            &outfit_image(),
            vec![
                raw("person", 0.9, 0, 0, 100, 200),
                raw("tie", 0.6, 40, 10, 60, 90),
                raw("car", 0.9, 0, 0, 50, 50),
                raw("handbag", 0.2, 0, 0, 50, 50),
            ],
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "tie");
        let attrs = items[0].attributes.as_ref().unwrap();
        assert_eq!(attrs.style.as_str(), "formal");
        assert_eq!(attrs.detection_method, DetectionMethod::Heuristic);
        assert!(!items[0].segmentation_available);
    }

    #[test]
    fn low_confidence_person_is_ignored() {
        let analyzer = FashionAnalyzer::default();
        let items = analyzer.detect_items(&outfit_image(), vec![raw("person", 0.25, 0, 0, 100, 200)]);
        assert!(items.is_empty());
    }

    #[test]
    fn masked_detection_reports_area_and_fit() {
        let analyzer = FashionAnalyzer::default();
        let image = outfit_image();
        let mask = Mask::from_fn(100, 200, |x, y| (40..50).contains(&x) && y < 100);
        let det = raw("tie", 0.8, 40, 0, 50, 100).with_mask(mask);
        let tiny = raw("scarf", 0.8, 0, 0, 5, 5).with_mask(Mask::from_fn(100, 200, |x, y| x < 5 && y < 5));

        let items = analyzer.detect_items(&image, vec![det, tiny]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].mask_area, Some(1000));
        assert!(items[0].segmentation_available);
        let attrs = items[0].attributes.as_ref().unwrap();
        assert_eq!(attrs.fit.as_str(), "tight");
        assert_eq!(attrs.pattern.as_str(), "solid");
        assert_eq!(items[0].colors.len(), 1);
    }

    #[test]
    fn whole_frame_detection_gets_basic_attributes() {
        let analyzer = FashionAnalyzer::default();
        let image = outfit_image();
        let items = analyzer.detect_items(&image, vec![raw(WHOLE_FRAME_LABEL, 0.5, 0, 0, 100, 200)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].colors.len(), 2);
        assert_eq!(
            items[0].attributes.as_ref().unwrap().detection_method,
            DetectionMethod::Basic
        );
    }

    #[test]
    fn candidates_skip_small_and_non_fashion_boxes() {
        let analyzer = FashionAnalyzer::default();
        let candidates = analyzer.collect_candidates(vec![
            raw("handbag", 0.7, 0, 0, 40, 40),
            raw("tie", 0.9, 0, 0, 10, 60),
            raw("dog", 0.9, 0, 0, 60, 60),
            raw("backpack", 0.31, 10, 10, 90, 90),
            raw(WHOLE_FRAME_LABEL, 0.5, 0, 0, 100, 200),
        ]);
        let labels: Vec<_> = candidates.iter().map(|c| (c.id, c.label.as_str())).collect();
        assert_eq!(labels, vec![(1, "handbag"), (2, "backpack")]);
        assert_eq!(candidates[0].description(), "handbag (confidence: 70.0%)");
    }

    #[test]
    fn single_candidate_is_analysed_directly() {
        let analyzer = FashionAnalyzer::default();
        let outcome = analyzer.analyze(&outfit_image(), vec![raw("tie", 0.9, 0, 0, 100, 90)]);
        let FashionOutcome::Single(analysis) = outcome else {
            panic!("expected a single analysis");
        };
        assert_eq!(analysis.detected_as, "tie");
        assert_eq!(analysis.clothing_type.as_str(), "tie");
        assert_eq!(analysis.applicable_styles, vec![StyleCategory::Casual]);
        assert_eq!(analysis.colors.len(), 1);
        assert!(analysis.color_description.starts_with("The clothing item is primarily"));
    }

    #[test]
    fn nothing_detected_falls_back_to_whole_image() {
        let analyzer = FashionAnalyzer::default();
        let outcome = analyzer.analyze(&outfit_image(), Vec::new());
        let FashionOutcome::WholeImage(analysis) = outcome else {
            panic!("expected whole image analysis");
        };
        assert_eq!(analysis.clothing_type.as_str(), "dress");
        assert_eq!(analysis.detected_as, "whole_image_analysis");
        assert_eq!(analysis.confidence, 0.5);
        assert!(analysis.note.is_some());
        assert_eq!(analysis.colors.len(), 2);
    }

    #[test]
    fn quick_colors_drop_minor_shares() {
        // 50 % red, 37.5 % blue, 12.5 % green.
        let image = RgbImage::from_fn(25, 40, |_, y| match y {
            0..=19 => Rgb([200, 30, 30]),
            20..=34 => Rgb([30, 30, 200]),
            _ => Rgb([30, 200, 30]),
        });
        let analyzer = FashionAnalyzer::default();

        let full = analyzer.dominant_colors(&image, false);
        assert_eq!(full.len(), 3);
        assert_eq!(full[2].percentage, 12.5);

        let quick = analyzer.dominant_colors(&image, true);
        assert_eq!(quick.len(), 2);
        assert_eq!(quick[0].percentage, 50.0);
        assert_eq!(quick[1].percentage, 37.5);

        let mobile = FashionAnalyzer::new(AnalyzerSettings::fast());
        assert_eq!(mobile.analyze_whole_image(&image).colors.len(), 2);
    }

    #[test]
    fn rule_ladder_naming_reaches_every_analysis() {
        let navy = RgbImage::from_pixel(60, 60, Rgb([0, 0, 128]));

        let css = FashionAnalyzer::default().analyze_whole_image(&navy);
        assert_eq!(css.colors[0].name, "navy");

        let ladder = FashionAnalyzer::new(
            AnalyzerSettings::default().with_naming(ColorNaming::RuleLadder),
        );
        assert_eq!(ladder.analyze_whole_image(&navy).colors[0].name, "darkblue");
        assert_eq!(ladder.dominant_colors(&navy, true)[0].name, "darkblue");
        let items = ladder.detect_items(&navy, vec![raw("jacket", 0.9, 0, 0, 60, 60)]);
        assert_eq!(items[0].colors[0].name, "darkblue");
    }

    #[test]
    fn selection_out_of_range() {
        let analyzer = FashionAnalyzer::default();
        let candidates = analyzer.collect_candidates(vec![
            raw("handbag", 0.7, 0, 0, 40, 40),
            raw("backpack", 0.8, 10, 10, 90, 90),
        ]);
        let image = outfit_image();
        assert_eq!(
            analyzer.analyze_selected(&image, 0, &candidates).unwrap_err(),
            SelectionError::OutOfRange {
                requested: 0,
                available: 2
            }
        );
        assert!(analyzer.analyze_selected(&image, 3, &candidates).is_err());
        let analysis = analyzer.analyze_selected(&image, 2, &candidates).unwrap();
        assert_eq!(analysis.detected_as, "backpack");
        assert_eq!(analysis.clothing_type.as_str(), "bag");
    }
}
