//! Rule based fashion attributes.
//!
//! Every rule is a keyword containment test on the lowercased label, evaluated
//! top to bottom with the first hit winning.

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::ColorSample;
use crate::detection::Mask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    Formal,
    Sporty,
    #[default]
    Casual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Season {
    Winter,
    Summer,
    SpringFall,
    #[default]
    AllSeason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Material {
    Denim,
    Leather,
    #[default]
    Cotton,
    Wool,
    Silk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    #[default]
    Solid,
    Patterned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fit {
    Tight,
    #[default]
    Regular,
    Loose,
}

/// Where a set of attributes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    Heuristic,
    Basic,
}

macro_rules! impl_display {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_display!(Style { Formal => "formal", Sporty => "sporty", Casual => "casual" });
impl_display!(Season {
    Winter => "winter",
    Summer => "summer",
    SpringFall => "spring-fall",
    AllSeason => "all-season",
});
impl_display!(Material {
    Denim => "denim",
    Leather => "leather",
    Cotton => "cotton",
    Wool => "wool",
    Silk => "silk",
});
impl_display!(Pattern { Solid => "solid", Patterned => "patterned" });
impl_display!(Fit { Tight => "tight", Regular => "regular", Loose => "loose" });
impl_display!(DetectionMethod { Heuristic => "heuristic", Basic => "basic" });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FashionAttributes {
    pub category: String,
    pub style: Style,
    pub season: Season,
    pub material: Material,
    pub pattern: Pattern,
    pub fit: Fit,
    pub dominant_color: String,
    pub detection_method: DetectionMethod,
}

/// Segmentation evidence for pattern and fit.
#[derive(Debug, Clone, Copy)]
pub struct MaskEvidence<'a> {
    pub image: &'a RgbImage,
    pub mask: &'a Mask,
}

impl<'a> MaskEvidence<'a> {
    pub fn new(image: &'a RgbImage, mask: &'a Mask) -> Self {
        Self { image, mask }
    }
}

const FORMAL_KEYWORDS: &[&str] = &["suit", "blazer", "tie", "dress shirt"];
const SPORTY_KEYWORDS: &[&str] = &["sneakers", "sports", "athletic", "hoodie"];
const CASUAL_KEYWORDS: &[&str] = &["jeans", "t-shirt", "casual"];
const FORMAL_COLORS: &[&str] = &["black", "white", "gray", "navy"];

const SEASON_RULES: &[(&[&str], Season)] = &[
    (&["coat", "jacket", "sweater", "boots"], Season::Winter),
    (&["shorts", "sandals", "tank", "summer"], Season::Summer),
    (&["cardigan", "light jacket"], Season::SpringFall),
];

const MATERIAL_RULES: &[(&[&str], Material)] = &[
    (&["jean"], Material::Denim),
    (&["leather", "boots"], Material::Leather),
    (&["cotton", "t-shirt"], Material::Cotton),
    (&["wool", "sweater"], Material::Wool),
    (&["silk", "dress"], Material::Silk),
];

/// Luminance variance above this marks a garment as patterned.
pub const PATTERN_VARIANCE_THRESHOLD: f64 = 1000.0;
/// Mask height/width ratio bounds for tight and loose fits.
pub const TIGHT_FIT_RATIO: f32 = 2.5;
pub const LOOSE_FIT_RATIO: f32 = 1.5;

fn contains_any(label: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| label.contains(k))
}

pub fn infer_style(label: &str, colors: &[ColorSample]) -> Style {
    let label = label.to_lowercase();
    if contains_any(&label, FORMAL_KEYWORDS) {
        Style::Formal
    } else if contains_any(&label, SPORTY_KEYWORDS) {
        Style::Sporty
    } else if contains_any(&label, CASUAL_KEYWORDS) {
        Style::Casual
    } else if colors
        .iter()
        .any(|c| FORMAL_COLORS.contains(&c.name.as_str()))
    {
        Style::Formal
    } else {
        Style::Casual
    }
}

pub fn infer_season(label: &str) -> Season {
    let label = label.to_lowercase();
    SEASON_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&label, keywords))
        .map_or(Season::AllSeason, |(_, season)| *season)
}

pub fn infer_material(label: &str) -> Material {
    let label = label.to_lowercase();
    MATERIAL_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&label, keywords))
        .map_or(Material::Cotton, |(_, material)| *material)
}

/// Population variance of integer luminance over the masked pixels.
pub fn luminance_variance(pixels: &[[u8; 3]]) -> Option<f64> {
    if pixels.is_empty() {
        return None;
    }
    let lum: Vec<f64> = pixels
        .iter()
        .map(|p| (0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64).round())
        .collect();
    let n = lum.len() as f64;
    let mean = lum.iter().sum::<f64>() / n;
    Some(lum.iter().map(|l| (l - mean) * (l - mean)).sum::<f64>() / n)
}

pub fn infer_pattern(evidence: Option<MaskEvidence<'_>>) -> Pattern {
    let Some(evidence) = evidence else {
        return Pattern::Solid;
    };
    match luminance_variance(&evidence.mask.select(evidence.image)) {
        Some(variance) if variance > PATTERN_VARIANCE_THRESHOLD => Pattern::Patterned,
        _ => Pattern::Solid,
    }
}

pub fn infer_fit(mask: Option<&Mask>) -> Fit {
    let Some((height, width)) = mask.and_then(Mask::extent) else {
        return Fit::Regular;
    };
    if height == 0 || width == 0 {
        return Fit::Regular;
    }
    let ratio = height as f32 / width as f32;
    if ratio > TIGHT_FIT_RATIO {
        Fit::Tight
    } else if ratio < LOOSE_FIT_RATIO {
        Fit::Loose
    } else {
        Fit::Regular
    }
}

fn dominant_color(colors: &[ColorSample]) -> String {
    colors
        .first()
        .map_or_else(|| "unknown".to_string(), |c| c.name.clone())
}

/// Heuristic attributes from a label, its colors and optional mask evidence.
pub fn infer_attributes(
    label: &str,
    colors: &[ColorSample],
    mask: Option<MaskEvidence<'_>>,
) -> FashionAttributes {
    FashionAttributes {
        category: label.to_string(),
        style: infer_style(label, colors),
        season: infer_season(label),
        material: infer_material(label),
        pattern: infer_pattern(mask),
        fit: infer_fit(mask.map(|m| m.mask)),
        dominant_color: dominant_color(colors),
        detection_method: DetectionMethod::Heuristic,
    }
}

/// Minimal attributes for regions that were not classified individually.
pub fn basic_attributes(label: &str, colors: &[ColorSample]) -> FashionAttributes {
    FashionAttributes {
        category: label.to_string(),
        style: Style::Casual,
        season: Season::AllSeason,
        material: Material::Cotton,
        pattern: Pattern::Solid,
        fit: Fit::Regular,
        dominant_color: dominant_color(colors),
        detection_method: DetectionMethod::Basic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(name: &str) -> ColorSample {
        ColorSample {
            name: name.to_string(),
            rgb: [0, 0, 0],
            percentage: 100.0,
        }
    }

    #[test]
    fn style_rules_in_order() {
        assert_eq!(infer_style("Business Suit", &[]), Style::Formal);
        assert_eq!(infer_style("tie", &[]), Style::Formal);
        assert_eq!(infer_style("athletic hoodie", &[]), Style::Sporty);
        assert_eq!(infer_style("jeans", &[color("black")]), Style::Casual);
        assert_eq!(infer_style("skirt", &[color("red"), color("navy")]), Style::Formal);
        assert_eq!(infer_style("skirt", &[color("red")]), Style::Casual);
    }

    #[test]
    fn season_rules_in_order() {
        assert_eq!(infer_season("rain coat"), Season::Winter);
        assert_eq!(infer_season("denim shorts"), Season::Summer);
        assert_eq!(infer_season("tank top"), Season::Summer);
        assert_eq!(infer_season("cardigan"), Season::SpringFall);
        // "jacket" is checked before "light jacket".
        assert_eq!(infer_season("light jacket"), Season::Winter);
        assert_eq!(infer_season("skirt"), Season::AllSeason);
    }

    #[test]
    fn material_rules_in_order() {
        assert_eq!(infer_material("Jeans"), Material::Denim);
        assert_eq!(infer_material("leather jacket"), Material::Leather);
        assert_eq!(infer_material("t-shirt"), Material::Cotton);
        assert_eq!(infer_material("wool sweater"), Material::Wool);
        assert_eq!(infer_material("dress"), Material::Silk);
        assert_eq!(infer_material("scarf"), Material::Cotton);
    }

    #[test]
    fn pattern_from_luminance_variance() {
        let striped = RgbImage::from_fn(20, 20, |x, _| {
            if x % 2 == 0 {
                image::Rgb([250, 250, 250])
            } else {
                image::Rgb([10, 10, 10])
            }
        });
        let plain = RgbImage::from_pixel(20, 20, image::Rgb([90, 30, 30]));
        let mask = Mask::from_fn(20, 20, |_, _| true);

        assert_eq!(infer_pattern(Some(MaskEvidence::new(&striped, &mask))), Pattern::Patterned);
        assert_eq!(infer_pattern(Some(MaskEvidence::new(&plain, &mask))), Pattern::Solid);
        assert_eq!(infer_pattern(None), Pattern::Solid);
    }

    #[test]
    fn fit_from_mask_extent() {
        let tall = Mask::from_fn(40, 100, |x, _| (10..=20).contains(&x));
        let wide = Mask::from_fn(100, 40, |_, _| true);
        let square = Mask::from_fn(50, 50, |x, y| x <= 20 && y <= 40);
        let column = Mask::from_fn(10, 10, |x, _| x == 3);
        let row = Mask::from_fn(10, 10, |_, y| y == 3);

        assert_eq!(infer_fit(Some(&tall)), Fit::Tight);
        assert_eq!(infer_fit(Some(&wide)), Fit::Loose);
        assert_eq!(infer_fit(Some(&square)), Fit::Regular);
        assert_eq!(infer_fit(Some(&column)), Fit::Regular);
        assert_eq!(infer_fit(Some(&row)), Fit::Regular);
        assert_eq!(infer_fit(None), Fit::Regular);
    }

    #[test]
    fn defaults_for_unknown_label() {
        let attrs = infer_attributes("gizmo", &[], None);
        assert_eq!(attrs.style, Style::Casual);
        assert_eq!(attrs.season, Season::AllSeason);
        assert_eq!(attrs.material, Material::Cotton);
        assert_eq!(attrs.pattern, Pattern::Solid);
        assert_eq!(attrs.fit, Fit::Regular);
        assert_eq!(attrs.dominant_color, "unknown");
        assert_eq!(attrs.detection_method, DetectionMethod::Heuristic);
    }

    #[test]
    fn serializes_kebab_case() {
        let attrs = basic_attributes("shirt", &[color("white")]);
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["season"], "all-season");
        assert_eq!(json["detection_method"], "basic");
        assert_eq!(json["dominant_color"], "white");
        assert_eq!(Season::SpringFall.to_string(), "spring-fall");
    }
}
