//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use vbatch::{ContainerFormat, QualityTier, Rotation};

#[derive(Debug, Parser)]
#[command(
    name = "vbatch",
    version,
    about = "Batch video transcoder driving an external ffmpeg binary"
)]
pub struct Args {
    /// Source video files to transcode.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory; defaults to each source's own directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output container(s): mp4, mkv. One task per (format, quality) pair.
    #[arg(short, long, value_delimiter = ',', default_value = "mp4")]
    pub format: Vec<ContainerFormat>,

    /// Quality tier(s): lossless, hd, balanced, compact.
    #[arg(short, long, value_delimiter = ',', default_value = "balanced")]
    pub quality: Vec<QualityTier>,

    /// Rotation: none, left90, right90, flip180.
    #[arg(long, default_value = "none")]
    pub rotate: Rotation,

    /// Seconds to trim from the start of each source.
    #[arg(long, default_value_t = 0.0)]
    pub trim_start: f64,

    /// Seconds to trim from the end of each source.
    #[arg(long, default_value_t = 0.0)]
    pub trim_end: f64,

    /// Stabilization smoothing level, 0 (off) to 35.
    #[arg(long, default_value_t = 0)]
    pub stabilize: u8,

    /// Concurrent encodes (1-15).
    #[arg(short = 'j', long, default_value_t = 3)]
    pub jobs: usize,

    /// Encoder binary; defaults to a bundled ffmpeg, then PATH lookup.
    #[arg(long)]
    pub encoder: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}
