use image::{GrayImage, Luma, RgbImage};

use crate::config::Mode;
use crate::errors::{DriveSegError, Result};
use crate::traits::DrivePerceptionModel;
use crate::types::{BBox, Inference, SegmentMap};
use crate::visualize::{DRIVABLE_COLOR, LANE_COLOR};

/// Deterministic stand-in for the ONNX model, used by runner tests.
///
/// Detections are whatever the constructor was given; segmentation maps
/// mark the top-left quadrant of the image.
#[derive(Debug, Clone)]
pub struct MockPerceptionModel {
    pub image_size: u32,
    boxes: Vec<BBox>,
}

impl MockPerceptionModel {
    pub const fn new(image_size: u32, boxes: Vec<BBox>) -> Self {
        Self { image_size, boxes }
    }

    /// Mock that reports one confident detection.
    pub fn with_detection(image_size: u32) -> Self {
        Self::new(
            image_size,
            vec![BBox {
                x1: 1.0,
                y1: 1.0,
                x2: 6.0,
                y2: 6.0,
                score: 0.9,
            }],
        )
    }

    /// Mock that never detects anything.
    pub const fn without_detections(image_size: u32) -> Self {
        Self::new(image_size, Vec::new())
    }

    fn quadrant_map(&self, image: &RgbImage, color: image::Rgb<u8>) -> SegmentMap {
        let (w, h) = image.dimensions();
        let mut class_map = GrayImage::new(w, h);
        let mut color_map = RgbImage::new(w, h);
        for y in 0..h / 2 {
            for x in 0..w / 2 {
                class_map.put_pixel(x, y, Luma([255]));
                color_map.put_pixel(x, y, color);
            }
        }
        SegmentMap {
            class_map,
            color_map,
        }
    }
}

impl DrivePerceptionModel for MockPerceptionModel {
    fn infer(&self, image: &RgbImage, mode: Mode) -> Result<Inference> {
        let drivable = self.quadrant_map(image, DRIVABLE_COLOR);
        match mode {
            Mode::DaOnly => Ok(Inference::DriveAreaOnly { drivable }),
            Mode::Full => Ok(Inference::Full {
                boxes: self.boxes.clone(),
                drivable,
                lanes: self.quadrant_map(image, LANE_COLOR),
            }),
        }
    }

    fn input_size(&self) -> u32 {
        self.image_size
    }
}

/// Mock whose inference always fails, for the per-item fault path.
#[derive(Debug, Clone, Copy)]
pub struct FailingPerceptionModel;

impl DrivePerceptionModel for FailingPerceptionModel {
    fn infer(&self, _image: &RgbImage, _mode: Mode) -> Result<Inference> {
        Err(DriveSegError::Model {
            operation: "mock inference".to_string(),
            source: Box::new(std::io::Error::other("forced failure")),
        })
    }

    fn input_size(&self) -> u32 {
        640
    }
}
