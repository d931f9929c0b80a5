use anyhow::{ensure, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::types::BBox;

pub const DRIVABLE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LANE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 255]);

const BOX_THICKNESS: u32 = 2;

/// Draw hollow detection rectangles onto the image in place.
pub fn draw_boxes_mut(image: &mut RgbImage, boxes: &[BBox]) {
    for bbox in boxes {
        let w = bbox.width().round() as u32;
        let h = bbox.height().round() as u32;
        if w == 0 || h == 0 {
            continue;
        }
        let x = bbox.x1.round() as i32;
        let y = bbox.y1.round() as i32;
        for t in 0..BOX_THICKNESS {
            if w <= 2 * t || h <= 2 * t {
                break;
            }
            let rect = Rect::at(x + t as i32, y + t as i32).of_size(w - 2 * t, h - 2 * t);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }
    }
}

/// Elementwise saturating addition of two equally sized images.
pub fn add_images(a: &RgbImage, b: &RgbImage) -> Result<RgbImage> {
    ensure!(
        a.dimensions() == b.dimensions(),
        "image dimensions do not match: {:?} vs {:?}",
        a.dimensions(),
        b.dimensions()
    );

    let mut out = a.clone();
    for (dst, src) in out.pixels_mut().zip(b.pixels()) {
        for c in 0..3 {
            dst.0[c] = dst.0[c].saturating_add(src.0[c]);
        }
    }
    Ok(out)
}

/// Per-pixel weighted blend `a * alpha + b * beta`, rounded and clamped.
pub fn blend_weighted(a: &RgbImage, b: &RgbImage, alpha: f32, beta: f32) -> Result<RgbImage> {
    ensure!(
        a.dimensions() == b.dimensions(),
        "image dimensions do not match: {:?} vs {:?}",
        a.dimensions(),
        b.dimensions()
    );

    let mut out = RgbImage::new(a.width(), a.height());
    for ((dst, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        for c in 0..3 {
            let v = f32::from(pa.0[c]) * alpha + f32::from(pb.0[c]) * beta;
            dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_saturates_at_channel_maximum() {
        let a = RgbImage::from_pixel(4, 4, Rgb([200, 10, 0]));
        let b = RgbImage::from_pixel(4, 4, Rgb([100, 20, 0]));

        let sum = add_images(&a, &b).unwrap();
        assert_eq!(*sum.get_pixel(0, 0), Rgb([255, 30, 0]));
    }

    #[test]
    fn add_rejects_mismatched_dimensions() {
        let a = RgbImage::new(4, 4);
        let b = RgbImage::new(5, 4);
        assert!(add_images(&a, &b).is_err());
    }

    #[test]
    fn blend_half_half_averages_pixels() {
        let a = RgbImage::from_pixel(2, 2, Rgb([100, 0, 50]));
        let b = RgbImage::from_pixel(2, 2, Rgb([200, 0, 150]));

        let blended = blend_weighted(&a, &b, 0.5, 0.5).unwrap();
        assert_eq!(*blended.get_pixel(0, 0), Rgb([150, 0, 100]));
    }

    #[test]
    fn blend_rejects_mismatched_dimensions() {
        let a = RgbImage::new(2, 2);
        let b = RgbImage::new(2, 3);
        assert!(blend_weighted(&a, &b, 0.5, 0.5).is_err());
    }

    #[test]
    fn draw_boxes_touches_the_outline_only() {
        let mut image = RgbImage::new(20, 20);
        let boxes = [BBox {
            x1: 5.0,
            y1: 5.0,
            x2: 15.0,
            y2: 15.0,
            score: 0.9,
        }];

        draw_boxes_mut(&mut image, &boxes);
        assert_eq!(*image.get_pixel(5, 5), BOX_COLOR);
        assert_eq!(*image.get_pixel(6, 6), BOX_COLOR);
        assert_eq!(*image.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn draw_boxes_ignores_degenerate_boxes() {
        let mut image = RgbImage::new(20, 20);
        let boxes = [BBox {
            x1: 5.0,
            y1: 5.0,
            x2: 5.0,
            y2: 15.0,
            score: 0.9,
        }];

        draw_boxes_mut(&mut image, &boxes);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
