use std::path::Path;

use anyhow::Context;
use fashion_common::color;
use fashion_common::detection::{Detection, DetectionBackend};
use fashion_common::pipeline::FashionAnalyzer;
use fashion_common::report::DetectionReport;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MASKED_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Detects and analyses clothing in a single image file.
pub fn process_image(
    path: &Path,
    backend: &mut dyn DetectionBackend,
    analyzer: &FashionAnalyzer,
) -> anyhow::Result<()> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {path:?}"))?
        .to_rgb8();

    let raw = backend.detect(&image)?;
    log::debug!("{} raw detections", raw.len());
    let detections = analyzer.detect_items(&image, raw);

    let report = DetectionReport::new(
        path.display().to_string(),
        image.dimensions(),
        backend.kind(),
        detections,
    );
    report.print_summary();

    // Save output: image & report.
    let img_output_path = path.with_extension("out.jpg");
    annotate(&image, &report.detections).save(&img_output_path)?;

    let report_output_path = path.with_extension("out.json");
    report.export_json(&report_output_path)?;
    println!("Results saved to: {report_output_path:?}, {img_output_path:?}");

    Ok(())
}

/// Prints the dominant colors of the whole image.
pub fn print_colors(path: &Path, analyzer: &FashionAnalyzer) -> anyhow::Result<()> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {path:?}"))?
        .to_rgb8();
    let colors = analyzer.dominant_colors(&image, false);

    println!("\nColors in {path:?}:");
    for c in &colors {
        println!("  {:>5.1}%  {:<16} {}", c.percentage, c.name, c.hex());
    }
    println!("{}", color::describe_colors(&colors));
    Ok(())
}

/// Copy of `image` with a rectangle around every detection.
fn annotate(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = image.clone();
    for det in detections {
        let bbox = &det.bounding_box;
        let color = if det.segmentation_available {
            MASKED_BOX_COLOR
        } else {
            BOX_COLOR
        };
        let rect = Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(bbox.width, bbox.height);
        draw_hollow_rect_mut(&mut out, rect, color);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fashion_common::detection::{BasicBackend, BoundingBox};

    #[test]
    fn annotate_draws_box_outline() {
        let image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let det = Detection {
            label: "shirt".into(),
            confidence: 0.9,
            bounding_box: BoundingBox::new(2, 3, 12, 13).unwrap(),
            colors: Vec::new(),
            attributes: None,
            mask_area: None,
            segmentation_available: false,
            mask: None,
        };

        let out = annotate(&image, &[det]);
        assert_eq!(out.get_pixel(2, 3), &BOX_COLOR);
        assert_eq!(out.get_pixel(11, 12), &BOX_COLOR);
        assert_eq!(out.get_pixel(6, 8), &Rgb([0, 0, 0]));
    }

    #[test]
    fn writes_report_and_annotated_image() {
        let dir = std::env::temp_dir().join(format!("fashion_cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("outfit.png");
        RgbImage::from_fn(40, 60, |_, y| if y < 30 { Rgb([200, 30, 30]) } else { Rgb([30, 30, 200]) })
            .save(&input)
            .unwrap();

        process_image(&input, &mut BasicBackend, &FashionAnalyzer::default()).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("outfit.out.json")).unwrap())
                .unwrap();
        assert_eq!(report["backend"], "basic");
        assert_eq!(report["total_items"], 1);
        assert!(dir.join("outfit.out.jpg").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
