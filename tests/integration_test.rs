use std::fs;
use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};
use tempfile::TempDir;

use drive_seg_rs::{
    BBox, BatchRunner, Config, DrivePerceptionModel, Inference, Mode, SegmentMap,
};

// Mock model defined against the public trait, as external users would.
#[derive(Debug, Clone)]
struct StripeModel {
    boxes: Vec<BBox>,
}

impl StripeModel {
    fn detecting() -> Self {
        Self {
            boxes: vec![BBox {
                x1: 2.0,
                y1: 2.0,
                x2: 10.0,
                y2: 10.0,
                score: 0.8,
            }],
        }
    }

    fn blind() -> Self {
        Self { boxes: Vec::new() }
    }

    fn stripe_map(image: &RgbImage, color: Rgb<u8>) -> SegmentMap {
        let (w, h) = image.dimensions();
        let mut class_map = GrayImage::new(w, h);
        let mut color_map = RgbImage::new(w, h);
        for y in (0..h).step_by(2) {
            for x in 0..w {
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

impl DrivePerceptionModel for StripeModel {
    fn infer(&self, image: &RgbImage, mode: Mode) -> drive_seg_rs::Result<Inference> {
        let drivable = Self::stripe_map(image, Rgb([0, 255, 0]));
        match mode {
            Mode::DaOnly => Ok(Inference::DriveAreaOnly { drivable }),
            Mode::Full => Ok(Inference::Full {
                boxes: self.boxes.clone(),
                drivable,
                lanes: Self::stripe_map(image, Rgb([255, 0, 0])),
            }),
        }
    }

    fn input_size(&self) -> u32 {
        640
    }
}

fn config_for(root: &Path, mode: Mode, time: bool) -> Config {
    Config {
        input_dir: root.join("Images"),
        output_dir: root.join("Output"),
        model_path: "yolop-640-640.onnx".into(),
        num_threads: 16,
        device_id: 0,
        mode,
        time,
        score_threshold: 0.25,
        iou_threshold: 0.45,
    }
}

fn seed_image(dir: &Path, name: &str) {
    RgbImage::from_pixel(16, 12, Rgb([60, 60, 60]))
        .save(dir.join(name))
        .unwrap();
}

#[test]
fn batch_over_mixed_directory_writes_full_artifact_sets() {
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), Mode::Full, true);
    fs::create_dir_all(&config.input_dir).unwrap();

    seed_image(&config.input_dir, "dawn.png");
    seed_image(&config.input_dir, "dusk.png");
    // a non-image regular file and a subdirectory, both to be skipped
    fs::write(config.input_dir.join("README.md"), b"not pixels").unwrap();
    fs::create_dir_all(config.input_dir.join("archive")).unwrap();

    let runner = BatchRunner::new(StripeModel::detecting(), config);
    let summary = runner.run().unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.timings_ms.len(), 2);

    let output = temp.path().join("Output");
    let mut names: Vec<_> = fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(
        names,
        [
            "dawn_da.jpg",
            "dawn_det.jpg",
            "dawn_ll.jpg",
            "dawn_merge.jpg",
            "dusk_da.jpg",
            "dusk_det.jpg",
            "dusk_ll.jpg",
            "dusk_merge.jpg",
        ]
    );
}

#[test]
fn no_detections_leaves_the_output_directory_empty() {
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), Mode::Full, false);
    fs::create_dir_all(&config.input_dir).unwrap();
    seed_image(&config.input_dir, "empty_road.png");

    let runner = BatchRunner::new(StripeModel::blind(), config);
    let summary = runner.run().unwrap();

    assert_eq!(summary.written, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        fs::read_dir(temp.path().join("Output")).unwrap().count(),
        0
    );
}

#[test]
fn da_only_mode_ignores_missing_detections() {
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), Mode::DaOnly, false);
    fs::create_dir_all(&config.input_dir).unwrap();
    seed_image(&config.input_dir, "highway.png");

    let runner = BatchRunner::new(StripeModel::blind(), config);
    let summary = runner.run().unwrap();

    assert_eq!(summary.written, 1);
    let output = temp.path().join("Output");
    assert!(output.join("highway_da.jpg").is_file());
    assert_eq!(fs::read_dir(&output).unwrap().count(), 1);
}

#[test]
fn merge_artifact_is_darker_than_the_input_outside_masks() {
    let temp = TempDir::new().unwrap();
    let config = config_for(temp.path(), Mode::Full, false);
    fs::create_dir_all(&config.input_dir).unwrap();

    // bright input so the 0.5 blend against black is measurable
    RgbImage::from_pixel(16, 12, Rgb([200, 200, 200]))
        .save(config.input_dir.join("bright.png"))
        .unwrap();

    let runner = BatchRunner::new(StripeModel::detecting(), config);
    runner.run().unwrap();

    let merged = image::open(temp.path().join("Output/bright_merge.jpg"))
        .unwrap()
        .into_rgb8();
    // odd rows carry no mask color: ~0.5 * 200, with jpeg wiggle room
    let p = merged.get_pixel(12, 11);
    assert!(p.0[0] < 140, "expected darkened pixel, got {:?}", p);
}
