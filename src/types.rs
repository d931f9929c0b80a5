use image::{GrayImage, RgbImage};

/// Axis-aligned detection box in original-image coordinates, corner form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union; 0.0 when the union is empty.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// One segmentation head decoded back to original-image size.
///
/// `class_map` holds 0 for background and 255 for the segmented class;
/// `color_map` holds the head color on black, ready for alpha blending.
#[derive(Debug, Clone)]
pub struct SegmentMap {
    pub class_map: GrayImage,
    pub color_map: RgbImage,
}

/// Inference result, tagged by the outputs that were actually decoded.
#[derive(Debug, Clone)]
pub enum Inference {
    Full {
        boxes: Vec<BBox>,
        drivable: SegmentMap,
        lanes: SegmentMap,
    },
    DriveAreaOnly {
        drivable: SegmentMap,
    },
}
