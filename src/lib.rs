pub mod config;
pub mod errors;
pub mod model;
pub mod traits;
pub mod types;
pub mod visualize;

pub mod mocks;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

pub use config::{Config, Mode};
pub use errors::{DriveSegError, Result};
pub use model::YolopModel;
pub use traits::DrivePerceptionModel;
pub use types::{BBox, Inference, SegmentMap};

/// What a batch run did, for reporting and tests.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Images that decoded successfully and went into inference.
    pub attempted: usize,
    /// Images whose artifact set was written.
    pub written: usize,
    /// Files skipped for any per-item reason.
    pub skipped: usize,
    /// Per-image inference latency, in processing order. Empty unless
    /// timing was requested.
    pub timings_ms: Vec<f64>,
}

pub struct BatchRunner<M: DrivePerceptionModel> {
    model: M,
    config: Config,
}

impl<M: DrivePerceptionModel> BatchRunner<M> {
    pub const fn new(model: M, config: Config) -> Self {
        Self { model, config }
    }

    /// Run the model over every regular file in the input directory.
    ///
    /// Per-item failures (undecodable file, failed inference, failed
    /// write) are logged and skipped; the batch never aborts on them.
    pub fn run(&self) -> Result<RunSummary> {
        let input_dir = &self.config.input_dir;
        let output_dir = &self.config.output_dir;

        if !input_dir.is_dir() {
            return Err(DriveSegError::FileSystem {
                path: input_dir.clone(),
                operation: "input directory check".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        fs::create_dir_all(output_dir).map_err(|e| DriveSegError::FileSystem {
            path: output_dir.clone(),
            operation: "output directory creation".to_string(),
            source: e,
        })?;

        let files = collect_regular_files(input_dir);
        let mut summary = RunSummary::default();

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        for path in &files {
            self.process_file(path, &pb, &mut summary);
            pb.inc(1);
        }

        pb.finish_and_clear();

        if self.config.time {
            report_timings(&summary.timings_ms);
        }

        Ok(summary)
    }

    fn process_file(&self, path: &Path, pb: &ProgressBar, summary: &mut RunSummary) {
        pb.println(format!("Processing: {}", path.display()));

        let image = match image::open(path) {
            Ok(image) => image.into_rgb8(),
            Err(e) => {
                eprintln!("Error: unable to read image {}: {e}", path.display());
                summary.skipped += 1;
                return;
            }
        };

        summary.attempted += 1;
        let started = self.config.time.then(Instant::now);
        let inference = self.model.infer(&image, self.config.mode);
        if let Some(started) = started {
            summary.timings_ms.push(started.elapsed().as_secs_f64() * 1000.0);
        }

        let written = match inference {
            Err(e) => {
                eprintln!("Error: inference failed for {}: {e}", path.display());
                Ok(false)
            }
            Ok(Inference::Full { boxes, .. }) if boxes.is_empty() => {
                pb.println(format!(
                    "No detections or segmentation for {}",
                    path.display()
                ));
                Ok(false)
            }
            Ok(Inference::Full {
                boxes,
                drivable,
                lanes,
            }) => self
                .write_full_artifacts(path, &image, &boxes, &drivable, &lanes, pb)
                .map(|()| true),
            Ok(Inference::DriveAreaOnly { drivable }) => self
                .write_da_artifact(path, &drivable, pb)
                .map(|()| true),
        };

        match written {
            Ok(true) => summary.written += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                eprintln!("Error: failed to save outputs for {}: {e}", path.display());
                summary.skipped += 1;
            }
        }
    }

    fn artifact_path(&self, input: &Path, suffix: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.config.output_dir.join(format!("{stem}{suffix}.jpg"))
    }

    fn write_full_artifacts(
        &self,
        input: &Path,
        image: &RgbImage,
        boxes: &[BBox],
        drivable: &SegmentMap,
        lanes: &SegmentMap,
        pb: &ProgressBar,
    ) -> Result<()> {
        let det_path = self.artifact_path(input, "_det");
        let mut det_image = image.clone();
        visualize::draw_boxes_mut(&mut det_image, boxes);
        save_artifact(&image::DynamicImage::ImageRgb8(det_image), &det_path, pb)?;

        let da_path = self.artifact_path(input, "_da");
        save_artifact(
            &image::DynamicImage::ImageLuma8(drivable.class_map.clone()),
            &da_path,
            pb,
        )?;

        let ll_path = self.artifact_path(input, "_ll");
        save_artifact(
            &image::DynamicImage::ImageLuma8(lanes.class_map.clone()),
            &ll_path,
            pb,
        )?;

        let merge_path = self.artifact_path(input, "_merge");
        let color_seg = visualize::add_images(&drivable.color_map, &lanes.color_map)?;
        let mut merged = visualize::blend_weighted(image, &color_seg, 0.5, 0.5)?;
        visualize::draw_boxes_mut(&mut merged, boxes);
        save_artifact(&image::DynamicImage::ImageRgb8(merged), &merge_path, pb)?;

        Ok(())
    }

    fn write_da_artifact(
        &self,
        input: &Path,
        drivable: &SegmentMap,
        pb: &ProgressBar,
    ) -> Result<()> {
        let da_path = self.artifact_path(input, "_da");
        save_artifact(
            &image::DynamicImage::ImageLuma8(drivable.class_map.clone()),
            &da_path,
            pb,
        )
    }
}

/// Non-recursive listing of the regular files in `dir`, in the order the
/// filesystem yields them. Directories, symlinks and special files are
/// skipped silently.
fn collect_regular_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn save_artifact(image: &image::DynamicImage, path: &Path, pb: &ProgressBar) -> Result<()> {
    image.save(path).map_err(|e| DriveSegError::ImageProcessing {
        path: path.display().to_string(),
        operation: "artifact save".to_string(),
        source: Box::new(e),
    })?;
    pb.println(format!("Saved {} done!", path.display()));
    Ok(())
}

fn report_timings(timings_ms: &[f64]) {
    println!("Inference time per image:");
    for (index, ms) in timings_ms.iter().enumerate() {
        println!("{}: {ms:.2} ms", index + 1);
    }
}
