//! Per-image detection reports: console summary and JSON export.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::detection::{BackendKind, Detection};

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Everything found in one image.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub source: String,
    pub image: ImageInfo,
    pub backend: BackendKind,
    pub total_items: usize,
    pub detections: Vec<Detection>,
}

impl DetectionReport {
    pub fn new(
        source: impl Into<String>,
        (width, height): (u32, u32),
        backend: BackendKind,
        detections: Vec<Detection>,
    ) -> Self {
        Self {
            source: source.into(),
            image: ImageInfo { width, height },
            backend,
            total_items: detections.len(),
            detections,
        }
    }

    /// One line per detection: label, confidence, size and colors.
    pub fn format_detection(&self, detection: &Detection) -> String {
        let bbox = &detection.bounding_box;
        let frame_area = (self.image.width as f64 * self.image.height as f64).max(1.0);
        let mut parts = vec![
            format!("confidence={:.2}", detection.confidence),
            format!("box=({},{})-({},{})", bbox.x1, bbox.y1, bbox.x2, bbox.y2),
            format!(
                "size=({}x{}, {:.1}% of frame)",
                bbox.width,
                bbox.height,
                bbox.area() as f64 / frame_area * 100.0
            ),
        ];

        if !detection.colors.is_empty() {
            let colors: Vec<String> = detection
                .colors
                .iter()
                .map(|c| format!("{} {:.1}%", c.name, c.percentage))
                .collect();
            parts.push(format!("colors=[{}]", colors.join(", ")));
        }
        if let Some(attrs) = &detection.attributes {
            parts.push(format!(
                "style={} season={} material={} fit={}",
                attrs.style, attrs.season, attrs.material, attrs.fit
            ));
        }
        if let Some(area) = detection.mask_area {
            parts.push(format!("mask={area}px"));
        }

        format!("{}: {}", detection.label, parts.join(", "))
    }

    /// Prints detections grouped by label.
    pub fn print_summary(&self) {
        println!("\n--- {} ({} backend) ---", self.source, self.backend);
        if self.detections.is_empty() {
            println!("  No clothing items detected");
        }

        let mut by_label: BTreeMap<&str, Vec<&Detection>> = BTreeMap::new();
        for det in &self.detections {
            by_label.entry(det.label.as_str()).or_default().push(det);
        }
        for (label, dets) in &by_label {
            println!("  {}: {}", label, dets.len());
            for det in dets {
                println!("    {}", self.format_detection(det));
            }
        }
        println!("----------------\n");
    }

    pub fn export_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create report file {path:?}"))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
