//! Dominant color extraction for clothing regions.
//!
//! A region is reduced to at most a handful of k-means clusters, each reported
//! with a human readable name and its share of the analysed pixels.

pub mod kmeans;
pub mod naming;

use std::collections::HashSet;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::detection::{BoundingBox, Mask};
use crate::region;

use self::kmeans::KMeans;
use self::naming::ColorNaming;

/// One dominant color of a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    pub name: String,
    pub rgb: [u8; 3],
    /// Share of the analysed pixels, rounded to one decimal.
    pub percentage: f32,
}

impl ColorSample {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.rgb[0], self.rgb[1], self.rgb[2])
    }
}

/// Pixels darker or lighter than these bounds on every channel are treated as noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFilter {
    pub dark: u8,
    pub light: u8,
    /// Filtering is skipped when fewer pixels than this would survive.
    pub min_remaining: usize,
}

impl NoiseFilter {
    fn keeps(&self, p: &[u8; 3]) -> bool {
        p.iter().all(|&c| c > self.dark && c < self.light)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorAnalysisConfig {
    pub max_clusters: usize,
    pub min_percentage: f32,
    /// Images are downscaled so their longer side fits, when set.
    pub max_side: Option<u32>,
    /// Random subsample size cap, when set.
    pub max_samples: Option<usize>,
    pub noise_filter: Option<NoiseFilter>,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
    pub naming: ColorNaming,
}

impl ColorAnalysisConfig {
    /// Plain clustering of the given pixels, no sampling or filtering.
    pub fn exact(max_clusters: usize, min_percentage: f32) -> Self {
        Self {
            max_clusters,
            min_percentage,
            max_side: None,
            max_samples: None,
            noise_filter: None,
            n_init: 10,
            max_iter: 300,
            seed: 42,
            naming: ColorNaming::CssNearest,
        }
    }

    /// Per bounding box analysis.
    pub fn region() -> Self {
        Self {
            max_samples: Some(1000),
            ..Self::exact(3, 10.0)
        }
    }

    /// Pixels selected by a segmentation mask.
    pub fn masked() -> Self {
        Self {
            max_samples: Some(2000),
            ..Self::exact(5, 5.0)
        }
    }

    /// Whole photo or whole item crop.
    pub fn whole_image() -> Self {
        Self {
            max_side: Some(300),
            max_samples: Some(2000),
            noise_filter: Some(NoiseFilter {
                dark: 15,
                light: 240,
                min_remaining: 10,
            }),
            ..Self::exact(5, 5.0)
        }
    }

    /// Low latency path for mobile clients.
    pub fn fast() -> Self {
        Self {
            max_side: Some(100),
            max_samples: Some(1000),
            n_init: 3,
            max_iter: 100,
            ..Self::exact(3, 15.0)
        }
    }
}

impl Default for ColorAnalysisConfig {
    fn default() -> Self {
        Self::region()
    }
}

/// Dominant colors of already extracted region pixels.
///
/// Empty input gives an empty result; `max_clusters` is clamped to the number
/// of distinct colors.
pub fn analyze_region_colors(
    pixels: &[[u8; 3]],
    max_clusters: usize,
    min_percentage: f32,
) -> Vec<ColorSample> {
    analyze_pixels(pixels, &ColorAnalysisConfig::exact(max_clusters, min_percentage))
}

pub fn analyze_pixels(pixels: &[[u8; 3]], config: &ColorAnalysisConfig) -> Vec<ColorSample> {
    if pixels.is_empty() {
        return Vec::new();
    }

    let mut selected: Vec<[u8; 3]> = match &config.noise_filter {
        Some(filter) => {
            let kept: Vec<[u8; 3]> = pixels.iter().copied().filter(|p| filter.keeps(p)).collect();
            if kept.len() < filter.min_remaining {
                pixels.to_vec()
            } else {
                kept
            }
        }
        None => pixels.to_vec(),
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    if let Some(cap) = config.max_samples {
        if selected.len() > cap {
            let picked = rand::seq::index::sample(&mut rng, selected.len(), cap);
            selected = picked.iter().map(|i| selected[i]).collect();
        }
    }

    let distinct = selected.iter().collect::<HashSet<_>>().len();
    let k = config.max_clusters.min(distinct);
    if k == 0 {
        return Vec::new();
    }

    let points: Vec<kmeans::Point> = selected
        .iter()
        .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
        .collect();
    let kmeans = KMeans {
        k,
        n_init: config.n_init,
        max_iter: config.max_iter,
        tol: 1e-4,
        seed: config.seed,
    };
    let Some(clustering) = kmeans.fit(&points) else {
        log::warn!("Clustering produced no result for {} pixels", points.len());
        return Vec::new();
    };

    let total = points.len() as f32;
    let mut colors: Vec<ColorSample> = clustering
        .centroids
        .iter()
        .zip(clustering.cluster_sizes())
        .filter_map(|(centroid, size)| {
            let percentage = round1(size as f32 / total * 100.0);
            if size == 0 || percentage < config.min_percentage {
                return None;
            }
            let rgb = centroid.map(|c| c.round().clamp(0.0, 255.0) as u8);
            Some(ColorSample {
                name: config.naming.name(rgb),
                rgb,
                percentage,
            })
        })
        .collect();

    colors.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    colors
}

/// Colors of a whole image, downscaled first when the config asks for it.
pub fn analyze_image(image: &RgbImage, config: &ColorAnalysisConfig) -> Vec<ColorSample> {
    let scaled = match config.max_side {
        Some(max_side) => region::downscale(image, max_side),
        None => std::borrow::Cow::Borrowed(image),
    };
    analyze_pixels(&region::image_pixels(&scaled), config)
}

/// Colors inside a bounding box.
pub fn analyze_box(image: &RgbImage, bbox: &BoundingBox, config: &ColorAnalysisConfig) -> Vec<ColorSample> {
    match region::crop(image, bbox) {
        Some(crop) => analyze_image(&crop, config),
        None => Vec::new(),
    }
}

/// Colors under a segmentation mask.
pub fn analyze_masked(image: &RgbImage, mask: &Mask, config: &ColorAnalysisConfig) -> Vec<ColorSample> {
    analyze_pixels(&mask.select(image), config)
}

/// Short sentence summarising a color list.
pub fn describe_colors(colors: &[ColorSample]) -> String {
    match colors {
        [] => "No significant colors detected.".to_string(),
        [only] => format!(
            "The clothing item is primarily {} ({:.1}%).",
            only.name, only.percentage
        ),
        _ => {
            let parts: Vec<String> = colors
                .iter()
                .take(3)
                .map(|c| format!("{:.1}% {}", c.percentage, c.name))
                .collect();
            if colors.len() > 3 {
                format!("The clothing item contains: {}, and other colors.", parts.join(", "))
            } else {
                format!("The clothing item contains: {}.", parts.join(", "))
            }
        }
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
