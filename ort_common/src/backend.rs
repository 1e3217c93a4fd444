//! Startup capability negotiation: picks the best detector that can be loaded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fashion_common::detection::{BackendKind, BasicBackend, DetectionBackend};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use serde::{Deserialize, Serialize};

use crate::coco_classes;
use crate::segmentation::SegmentationDetector;
use crate::yolo::YoloDetector;

/// Requested detector; `auto` takes the most capable one available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    #[default]
    Auto,
    Yolo,
    Segmentation,
    Basic,
}

impl BackendPreference {
    /// Capabilities to try, most preferred first. Always ends with `Basic`.
    fn chain(&self) -> &'static [BackendKind] {
        match self {
            BackendPreference::Auto | BackendPreference::Segmentation => &[
                BackendKind::Segmentation,
                BackendKind::Yolo,
                BackendKind::Basic,
            ],
            BackendPreference::Yolo => &[BackendKind::Yolo, BackendKind::Basic],
            BackendPreference::Basic => &[BackendKind::Basic],
        }
    }
}

impl FromStr for BackendPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "yolo" => Ok(Self::Yolo),
            "segmentation" | "seg" | "maskrcnn" => Ok(Self::Segmentation),
            "basic" => Ok(Self::Basic),
            other => anyhow::bail!(
                "Unknown backend {other:?}, expected auto, yolo, segmentation or basic"
            ),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Yolo => "yolo",
            BackendPreference::Segmentation => "segmentation",
            BackendPreference::Basic => "basic",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorOptions {
    /// Square model input side.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Class names in output order; COCO names when unset.
    pub class_names: Option<Vec<String>>,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.3,
            iou_threshold: 0.5,
            class_names: None,
        }
    }
}

impl DetectorOptions {
    pub fn class_name(&self, class_id: usize) -> String {
        match &self.class_names {
            Some(names) => names
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{class_id}")),
            None => coco_classes::name(class_id).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    pub preference: BackendPreference,
    pub yolo_model: Option<PathBuf>,
    pub segmentation_model: Option<PathBuf>,
    /// Whether to attempt to use `cuda` hw acceleration.
    pub cuda: bool,
    pub detector: DetectorOptions,
}

impl BackendOptions {
    fn model_path(&self, kind: BackendKind) -> Option<&Path> {
        match kind {
            BackendKind::Yolo => self.yolo_model.as_deref(),
            BackendKind::Segmentation => self.segmentation_model.as_deref(),
            BackendKind::Basic => None,
        }
    }
}

/// Registers the execution provider with ort. Only needed before the first
/// model is loaded.
pub fn init_runtime(cuda: bool) -> anyhow::Result<()> {
    let (ep, ep_name) = if cuda {
        (CUDAExecutionProvider::default().build(), "cuda")
    } else {
        (CPUExecutionProvider::default().build(), "cpu")
    };
    ort::init().with_execution_providers([ep]).commit()?;
    log::info!("Prepared ort {ep_name} runtime");
    Ok(())
}

fn load(
    kind: BackendKind,
    path: &Path,
    options: &DetectorOptions,
) -> anyhow::Result<Box<dyn DetectionBackend>> {
    let backend: Box<dyn DetectionBackend> = match kind {
        BackendKind::Yolo => Box::new(YoloDetector::load(path, options.clone())?),
        BackendKind::Segmentation => Box::new(SegmentationDetector::load(path, options.clone())?),
        BackendKind::Basic => Box::new(BasicBackend),
    };
    Ok(backend)
}

/// Resolves one detector, walking down the preference chain until something
/// loads. Never fails: the basic whole-frame backend is the last resort.
pub fn resolve_backend(options: &BackendOptions) -> Box<dyn DetectionBackend> {
    let mut runtime_ready = false;

    for &kind in options.preference.chain() {
        if kind == BackendKind::Basic {
            break;
        }
        let Some(path) = options.model_path(kind) else {
            log::debug!("No {kind} model configured");
            continue;
        };
        if !path.exists() {
            log::warn!("{kind} model path {path:?} does not exist, using fallback");
            continue;
        }
        if !runtime_ready {
            if let Err(e) = init_runtime(options.cuda) {
                log::error!("Failed to initialise ort: {e:#}");
                break;
            }
            runtime_ready = true;
        }
        match load(kind, path, &options.detector) {
            Ok(backend) => {
                log::info!("Using {kind} detection backend");
                return backend;
            }
            Err(e) => log::warn!("Failed to load {kind} model, using fallback: {e:#}"),
        }
    }

    log::warn!("No detection model available, using basic whole-frame analysis");
    Box::new(BasicBackend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_preferences() {
        assert_eq!("auto".parse::<BackendPreference>().unwrap(), BackendPreference::Auto);
        assert_eq!("YOLO".parse::<BackendPreference>().unwrap(), BackendPreference::Yolo);
        assert_eq!(
            "maskrcnn".parse::<BackendPreference>().unwrap(),
            BackendPreference::Segmentation
        );
        assert!("detectron".parse::<BackendPreference>().is_err());
        assert_eq!(BackendPreference::Segmentation.to_string(), "segmentation");
    }

    #[test]
    fn every_chain_ends_with_basic() {
        for pref in [
            BackendPreference::Auto,
            BackendPreference::Yolo,
            BackendPreference::Segmentation,
            BackendPreference::Basic,
        ] {
            assert_eq!(pref.chain().last(), Some(&BackendKind::Basic));
        }
        assert_eq!(BackendPreference::Auto.chain()[0], BackendKind::Segmentation);
    }

    #[test]
    fn falls_back_to_basic_without_models() {
        let backend = resolve_backend(&BackendOptions::default());
        assert_eq!(backend.kind(), BackendKind::Basic);

        let missing = BackendOptions {
            preference: BackendPreference::Yolo,
            yolo_model: Some(PathBuf::from("/nonexistent/yolov8s.onnx")),
            ..BackendOptions::default()
        };
        assert_eq!(resolve_backend(&missing).kind(), BackendKind::Basic);
    }

    #[test]
    fn custom_class_names() {
        let options = DetectorOptions {
            class_names: Some(vec!["shirt".into(), "pants".into()]),
            ..DetectorOptions::default()
        };
        assert_eq!(options.class_name(1), "pants");
        assert_eq!(options.class_name(5), "class_5");
        assert_eq!(DetectorOptions::default().class_name(0), "person");
    }
}
