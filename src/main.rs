use anyhow::{ensure, Context, Result};

use drive_seg_rs::{BatchRunner, Config, YolopModel};

fn main() -> Result<()> {
    let config = Config::new();

    ensure!(
        config.model_path.exists(),
        "Model path does not exist: {}",
        config.model_path.display()
    );
    ensure!(
        config.input_dir.is_dir(),
        "Input directory does not exist: {}",
        config.input_dir.display()
    );

    println!("Using model: {}", config.model_path.display());
    println!("Input folder: {}", config.input_dir.display());
    println!("Output folder: {}", config.output_dir.display());

    let model = YolopModel::new(
        &config.model_path,
        config.num_threads,
        config.device_id,
        config.score_threshold,
        config.iou_threshold,
    )
    .context("failed to load the YOLOP model")?;

    let runner = BatchRunner::new(model, config);
    let summary = runner.run()?;

    println!(
        "Done: {} decoded, {} written, {} skipped",
        summary.attempted, summary.written, summary.skipped
    );

    Ok(())
}
