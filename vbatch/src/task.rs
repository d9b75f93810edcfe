//! Transcode task model.
//!
//! A [`Task`] is one unit of work: a single source file encoded to a single
//! (container, quality) combination. Batch expansion (one task per selected
//! format x quality) is the caller's job; the engine only ever sees
//! fully-resolved descriptors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest accepted stabilization smoothing level.
pub const MAX_STABILIZATION: u8 = 35;

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Mkv,
}

impl ContainerFormat {
    /// File extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            other => Err(format!("unknown container format: {other}")),
        }
    }
}

/// Quality tier, mapping to a fixed (CRF, x264 preset, filename suffix)
/// triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Lossless,
    Hd,
    Balanced,
    Compact,
}

impl QualityTier {
    /// CRF value passed to the encoder.
    pub fn crf(&self) -> u8 {
        match self {
            Self::Lossless => 0,
            Self::Hd => 18,
            Self::Balanced => 23,
            Self::Compact => 28,
        }
    }

    /// x264 preset name. Lossless output trades size for speed, the smaller
    /// tiers spend more encode time.
    pub fn preset(&self) -> &'static str {
        match self {
            Self::Lossless => "ultrafast",
            Self::Hd => "fast",
            Self::Balanced => "medium",
            Self::Compact => "slow",
        }
    }

    /// Suffix appended to output file names, e.g. `movie_HD.mp4`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Lossless => "Lossless",
            Self::Hd => "HD",
            Self::Balanced => "Balanced",
            Self::Compact => "Compact",
        }
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lossless" => Ok(Self::Lossless),
            "hd" => Ok(Self::Hd),
            "balanced" => Ok(Self::Balanced),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown quality tier: {other}")),
        }
    }
}

/// Rotation applied during the encode stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    None,
    Left90,
    Right90,
    Flip180,
}

impl FromStr for Rotation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "left90" | "left" => Ok(Self::Left90),
            "right90" | "right" => Ok(Self::Right90),
            "flip180" | "flip" => Ok(Self::Flip180),
            other => Err(format!("unknown rotation: {other}")),
        }
    }
}

/// Status of a transcode task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for an execution slot.
    Waiting,
    /// Pipeline is executing.
    Running,
    /// All stages exited cleanly.
    Completed,
    /// A stage failed to spawn or exited non-zero.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

impl TaskStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A single transcode task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique id, stable for the task's lifetime.
    pub id: Uuid,
    /// Source video file.
    pub source: PathBuf,
    /// Output file; unique per task, allocated by the caller.
    pub output: PathBuf,
    /// Output container.
    pub format: ContainerFormat,
    /// Quality tier this task was expanded from.
    pub quality: QualityTier,
    /// Rotation filter selection.
    pub rotation: Rotation,
    /// Seconds to skip from the start of the source.
    pub trim_start: f64,
    /// Seconds to drop from the end of the source.
    pub trim_end: f64,
    /// Stabilization smoothing level, 0 (disabled) to 35.
    pub stabilization: u8,
    /// x264 preset handed to the encoder.
    pub preset: String,
    /// CRF quality parameter handed to the encoder.
    pub crf: u8,

    /// Current status. Mutated only by the owning worker (and the scheduler
    /// for cancellation of never-admitted tasks).
    pub status: TaskStatus,
    /// Last emitted progress percentage, non-decreasing while running.
    pub progress: u8,
    /// Message of the most recent failure, if any.
    pub error: Option<String>,
}

impl Task {
    /// Create a task with preset and CRF defaulted from the quality tier.
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        format: ContainerFormat,
        quality: QualityTier,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            output: output.into(),
            format,
            quality,
            rotation: Rotation::None,
            trim_start: 0.0,
            trim_end: 0.0,
            stabilization: 0,
            preset: quality.preset().to_string(),
            crf: quality.crf(),
            status: TaskStatus::Waiting,
            progress: 0,
            error: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Trim seconds off the start and end of the source. Negative values are
    /// treated as zero.
    pub fn with_trim(mut self, start: f64, end: f64) -> Self {
        self.trim_start = start.max(0.0);
        self.trim_end = end.max(0.0);
        self
    }

    /// Set the stabilization smoothing level, clamped to [`MAX_STABILIZATION`].
    pub fn with_stabilization(mut self, level: u8) -> Self {
        self.stabilization = level.min(MAX_STABILIZATION);
        self
    }

    /// Output file name for a source under the shared naming convention:
    /// `<stem>_<QualitySuffix>.<ext>`.
    pub fn output_file_name(
        source: &Path,
        quality: QualityTier,
        format: ContainerFormat,
    ) -> String {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        format!("{}_{}.{}", stem, quality.suffix(), format.extension())
    }
}
