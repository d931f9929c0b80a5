use std::cmp::Ordering;
use std::path::Path;

use image::{imageops, imageops::FilterType, GrayImage, Luma, Rgb, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};
use parking_lot::Mutex;

use crate::config::Mode;
use crate::errors::{DriveSegError, Result};
use crate::traits::DrivePerceptionModel;
use crate::types::{BBox, Inference, SegmentMap};
use crate::visualize::{DRIVABLE_COLOR, LANE_COLOR};

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];
const PAD_VALUE: u8 = 114;

/// YOLOP multi-task model bound to an ONNX session.
///
/// One forward pass yields three heads: `det_out` `[1, N, 6]`,
/// `drive_area_seg` `[1, 2, s, s]` and `lane_line_seg` `[1, 2, s, s]`.
pub struct YolopModel {
    input_size: u32,
    score_threshold: f32,
    iou_threshold: f32,
    session: Mutex<Session>,
}

impl YolopModel {
    pub fn new(
        model_path: &Path,
        num_threads: usize,
        device_id: i32,
        score_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(|e| DriveSegError::Model {
                operation: "session builder initialization".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| DriveSegError::Model {
                operation: "execution provider registration".to_string(),
                source: Box::new(e),
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DriveSegError::Model {
                operation: "graph optimization level".to_string(),
                source: Box::new(e),
            })?
            .with_intra_threads(num_threads)
            .map_err(|e| DriveSegError::Model {
                operation: "intra-op thread configuration".to_string(),
                source: Box::new(e),
            })?
            .with_memory_pattern(true)
            .map_err(|e| DriveSegError::Model {
                operation: "memory pattern configuration".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| DriveSegError::Model {
                operation: format!("model file load: {}", model_path.display()),
                source: Box::new(e),
            })?;

        let shape = session.inputs[0]
            .input_type
            .tensor_shape()
            .ok_or_else(|| DriveSegError::Model {
                operation: "model input shape query".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "input tensor shape unavailable",
                )),
            })?[2];
        if shape <= 0 {
            return Err(DriveSegError::Model {
                operation: "model input shape query".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "dynamic input size is not supported",
                )),
            });
        }
        let input_size = shape as u32;

        // warm-up pass so the first real image does not pay graph setup cost
        let data = Array4::<f32>::zeros((1, 3, input_size as usize, input_size as usize));
        session
            .run(ort::inputs!["images" => TensorRef::from_array_view(&data).map_err(|e| {
                DriveSegError::Model {
                    operation: "warm-up tensor creation".to_string(),
                    source: Box::new(e),
                }
            })?])
            .map_err(|e| DriveSegError::Model {
                operation: "warm-up run".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            input_size,
            score_threshold,
            iou_threshold,
            session: Mutex::new(session),
        })
    }
}

impl DrivePerceptionModel for YolopModel {
    fn infer(&self, image: &RgbImage, mode: Mode) -> Result<Inference> {
        let (tensor, letterbox) = preprocess(image, self.input_size);
        let (orig_w, orig_h) = image.dimensions();

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            "images" => TensorRef::from_array_view(&tensor)?
        ])?;

        let drive_area = outputs["drive_area_seg"]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?;
        let drivable = decode_segmentation(
            drive_area.view(),
            &letterbox,
            orig_w,
            orig_h,
            DRIVABLE_COLOR,
        );

        match mode {
            Mode::DaOnly => Ok(Inference::DriveAreaOnly { drivable }),
            Mode::Full => {
                let det = outputs["det_out"]
                    .try_extract_array::<f32>()?
                    .into_dimensionality::<Ix3>()?;
                let lane_lines = outputs["lane_line_seg"]
                    .try_extract_array::<f32>()?
                    .into_dimensionality::<Ix4>()?;

                let boxes = decode_boxes(
                    det.view(),
                    &letterbox,
                    orig_w,
                    orig_h,
                    self.score_threshold,
                    self.iou_threshold,
                );
                let lanes =
                    decode_segmentation(lane_lines.view(), &letterbox, orig_w, orig_h, LANE_COLOR);

                Ok(Inference::Full {
                    boxes,
                    drivable,
                    lanes,
                })
            }
        }
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}

/// Placement of the source image inside the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Letterbox {
    pub ratio: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub new_w: u32,
    pub new_h: u32,
}

impl Letterbox {
    pub(crate) fn compute(src_w: u32, src_h: u32, size: u32) -> Self {
        let ratio = (size as f32 / src_w as f32).min(size as f32 / src_h as f32);
        let new_w = ((src_w as f32 * ratio) as u32).min(size).max(1);
        let new_h = ((src_h as f32 * ratio) as u32).min(size).max(1);
        Self {
            ratio,
            pad_x: (size - new_w) / 2,
            pad_y: (size - new_h) / 2,
            new_w,
            new_h,
        }
    }
}

/// Letterbox onto a gray canvas, then normalize to an NCHW tensor with
/// ImageNet statistics.
pub(crate) fn preprocess(image: &RgbImage, size: u32) -> (Array4<f32>, Letterbox) {
    let (src_w, src_h) = image.dimensions();
    let letterbox = Letterbox::compute(src_w, src_h, size);

    let resized = imageops::resize(image, letterbox.new_w, letterbox.new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE, PAD_VALUE, PAD_VALUE]));
    imageops::replace(
        &mut canvas,
        &resized,
        i64::from(letterbox.pad_x),
        i64::from(letterbox.pad_y),
    );

    let mut tensor = canvas
        .as_ndarray3()
        .mapv(|v| f32::from(v) / 255.0)
        .insert_axis(Axis(0));
    for c in 0..3 {
        let mut channel = tensor.slice_mut(s![0, c, .., ..]);
        channel -= MEAN[c];
        channel /= STD[c];
    }

    (tensor, letterbox)
}

/// Decode `det_out` rows `[cx, cy, w, h, obj, cls]`, map the survivors
/// back through the letterbox and suppress overlaps.
pub(crate) fn decode_boxes(
    det: ArrayView3<f32>,
    letterbox: &Letterbox,
    orig_w: u32,
    orig_h: u32,
    score_threshold: f32,
    iou_threshold: f32,
) -> Vec<BBox> {
    let pad_x = letterbox.pad_x as f32;
    let pad_y = letterbox.pad_y as f32;
    let mut boxes = Vec::new();

    for row in det.index_axis(Axis(0), 0).outer_iter() {
        let obj = row[4];
        if obj < score_threshold {
            continue;
        }
        let score = obj * row[5];
        if score < score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let x1 = ((cx - w / 2.0 - pad_x) / letterbox.ratio).clamp(0.0, orig_w as f32);
        let y1 = ((cy - h / 2.0 - pad_y) / letterbox.ratio).clamp(0.0, orig_h as f32);
        let x2 = ((cx + w / 2.0 - pad_x) / letterbox.ratio).clamp(0.0, orig_w as f32);
        let y2 = ((cy + h / 2.0 - pad_y) / letterbox.ratio).clamp(0.0, orig_h as f32);

        boxes.push(BBox {
            x1,
            y1,
            x2,
            y2,
            score,
        });
    }

    nms(boxes, iou_threshold)
}

/// Greedy hard non-maximum suppression, highest score first.
pub(crate) fn nms(mut boxes: Vec<BBox>, iou_threshold: f32) -> Vec<BBox> {
    boxes.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let mut keep = Vec::with_capacity(boxes.len());
    while !boxes.is_empty() {
        let current = boxes.remove(0);
        boxes.retain(|b| current.iou(b) < iou_threshold);
        keep.push(current);
    }
    keep
}

/// Per-pixel argmax over the two segmentation channels inside the
/// unpadded letterbox region, resized back to original size.
pub(crate) fn decode_segmentation(
    seg: ArrayView4<f32>,
    letterbox: &Letterbox,
    orig_w: u32,
    orig_h: u32,
    color: Rgb<u8>,
) -> SegmentMap {
    let mut class_map = GrayImage::new(letterbox.new_w, letterbox.new_h);
    let mut color_map = RgbImage::new(letterbox.new_w, letterbox.new_h);

    for y in 0..letterbox.new_h {
        for x in 0..letterbox.new_w {
            let sy = (y + letterbox.pad_y) as usize;
            let sx = (x + letterbox.pad_x) as usize;
            if seg[[0, 1, sy, sx]] > seg[[0, 0, sy, sx]] {
                class_map.put_pixel(x, y, Luma([255]));
                color_map.put_pixel(x, y, color);
            }
        }
    }

    SegmentMap {
        class_map: imageops::resize(&class_map, orig_w, orig_h, FilterType::Triangle),
        color_map: imageops::resize(&color_map, orig_w, orig_h, FilterType::Triangle),
    }
}
