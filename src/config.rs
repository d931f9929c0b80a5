use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which outputs to decode from the model.
///
/// The forward pass always produces all three heads; `DaOnly` skips the
/// detection and lane-line postprocessing and writes only the drivable
/// area mask.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Full,
    DaOnly,
}

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    pub input_dir: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(short, long)]
    pub model_path: PathBuf,

    /// Intra-op thread count handed to the ONNX session.
    #[arg(short, long, default_value_t = 16)]
    pub num_threads: usize,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(long, value_enum, default_value_t = Mode::Full)]
    pub mode: Mode,

    /// Collect per-image inference latency and print it after the run.
    #[arg(short, long, default_value_t = false)]
    pub time: bool,

    #[arg(long, default_value_t = 0.25)]
    pub score_threshold: f32,

    #[arg(long, default_value_t = 0.45)]
    pub iou_threshold: f32,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }
}
