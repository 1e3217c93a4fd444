//! ONNX Runtime detection backends.

pub mod backend;
pub mod coco_classes;
pub mod nms;
pub mod preprocess;
pub mod segmentation;
pub mod yolo;
