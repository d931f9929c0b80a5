use image::RgbImage;

use crate::config::Mode;
use crate::errors::Result;
use crate::types::Inference;

/// Abstraction over the driving-perception model so the batch runner can
/// be exercised without an ONNX session.
pub trait DrivePerceptionModel: Send + Sync {
    /// Run one forward pass and decode the outputs requested by `mode`.
    fn infer(&self, image: &RgbImage, mode: Mode) -> Result<Inference>;

    /// Square side length of the model input.
    fn input_size(&self) -> u32;
}
