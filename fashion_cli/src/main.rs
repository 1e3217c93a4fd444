mod process_image;

use std::path::PathBuf;

use clap::Parser;
use fashion_common::color::naming::ColorNaming;
use fashion_common::pipeline::{AnalyzerSettings, FashionAnalyzer};
use ort_common::backend::{resolve_backend, BackendOptions, BackendPreference, DetectorOptions};
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
pub struct Args {
    /// Path to input image (.jpeg/.png).
    input: PathBuf,
    /// Whether to attempt to use `cuda` hw acceleration.
    #[arg(long, action, default_value = "false")]
    cuda: bool,
    /// Yolov8 onnx model file to use.
    #[arg(long, short, default_value = "_models/yolov8s.onnx")]
    model: PathBuf,
    /// Yolov8-seg onnx model file to use.
    #[arg(long, default_value = "_models/yolov8s-seg.onnx")]
    seg_model: PathBuf,
    /// Detection backend: auto, yolo, segmentation or basic.
    #[arg(long, default_value = "auto")]
    backend: BackendPreference,
    /// Minimum detection confidence.
    #[arg(long, default_value = "0.3")]
    conf_threshold: f32,
    /// IoU above which overlapping boxes of one class are merged.
    #[arg(long, default_value = "0.5")]
    nms_threshold: f32,
    /// Only print the dominant colors of the whole image.
    #[arg(long, action, default_value = "false")]
    colors_only: bool,
    /// Use the fast color preset: 3 clusters, 15 % minimum share.
    #[arg(long, action, default_value = "false")]
    fast: bool,
    /// Name colors with the threshold ladder instead of the CSS table.
    #[arg(long, action, default_value = "false")]
    rule_names: bool,
}

impl Args {
    fn analyzer(&self) -> FashionAnalyzer {
        let settings = if self.fast {
            AnalyzerSettings::fast()
        } else {
            AnalyzerSettings::default()
        };
        let naming = if self.rule_names {
            ColorNaming::RuleLadder
        } else {
            ColorNaming::CssNearest
        };
        FashionAnalyzer::new(settings.with_naming(naming))
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,fashion_cli=info,ort_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.input.extension().and_then(|os_str| os_str.to_str()) {
        Some("jpeg" | "jpg" | "png") => {}
        Some(unk) => anyhow::bail!("Unhandled file extension: {unk}"),
        None => anyhow::bail!(
            "Input path does not have valid file extension: {:?}",
            args.input
        ),
    }

    let analyzer = args.analyzer();
    if args.colors_only {
        return process_image::print_colors(&args.input, &analyzer);
    }

    let mut backend = resolve_backend(&BackendOptions {
        preference: args.backend,
        yolo_model: Some(args.model),
        segmentation_model: Some(args.seg_model),
        cuda: args.cuda,
        detector: DetectorOptions {
            confidence_threshold: args.conf_threshold,
            iou_threshold: args.nms_threshold,
            ..DetectorOptions::default()
        },
    });
    log::info!("Using {} detection backend", backend.kind());

    process_image::process_image(&args.input, backend.as_mut(), &analyzer)
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn color_flags_reach_the_analyzer() {
        let navy = RgbImage::from_pixel(30, 30, Rgb([0, 0, 128]));

        let args = Args::parse_from(["fashion_cli", "outfit.png", "--fast", "--rule-names"]);
        let colors = args.analyzer().dominant_colors(&navy, false);
        assert_eq!(colors[0].name, "darkblue");

        let args = Args::parse_from(["fashion_cli", "outfit.png"]);
        assert_eq!(args.analyzer().dominant_colors(&navy, false)[0].name, "navy");
    }
}
