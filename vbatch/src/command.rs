//! Stage command construction.
//!
//! Pure mapping from a task descriptor to the argument vector of each
//! pipeline stage. Nothing here touches the filesystem or spawns a process,
//! which keeps the full invocation shape unit-testable.

use std::path::{Path, PathBuf};

use crate::task::{Rotation, Task};

/// One external-process invocation: a program and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Rendered command line for logging.
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Builds the probe, analysis and encode invocations for one task.
pub struct CommandBuilder<'a> {
    binary: &'a Path,
    task: &'a Task,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(binary: &'a Path, task: &'a Task) -> Self {
        Self { binary, task }
    }

    /// Duration probe: `ffmpeg -i <source>` with no output file. The
    /// invocation exits non-zero by design; only its banner output matters.
    pub fn probe_spec(&self) -> CommandSpec {
        CommandSpec::new(self.binary)
            .arg("-i")
            .arg(self.task.source.to_string_lossy())
    }

    /// Path of the motion-transform file the analysis stage writes and the
    /// encode stage reads. Derived from the task id so concurrent tasks
    /// never collide.
    pub fn transform_file(&self) -> PathBuf {
        let dir = self.task.output.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!("{}_stab.trf", self.task.id))
    }

    /// Stabilization analysis pass, present only when stabilization is
    /// enabled. Detects camera motion and writes the transform file; output
    /// is discarded.
    pub fn analysis_spec(&self) -> Option<CommandSpec> {
        if self.task.stabilization == 0 {
            return None;
        }
        let trf = escape_filter_path(&self.transform_file());
        Some(
            CommandSpec::new(self.binary)
                .arg("-y")
                .arg("-i")
                .arg(self.task.source.to_string_lossy())
                .arg("-vf")
                .arg(format!("vidstabdetect=result='{trf}'"))
                .arg("-f")
                .arg("null")
                .arg("-"),
        )
    }

    /// The encode invocation. `total_duration` is the probed source duration
    /// in seconds, or 0 when unknown (which disables the end-trim cap).
    pub fn encode_spec(&self, total_duration: f64) -> CommandSpec {
        let task = self.task;
        let mut spec = CommandSpec::new(self.binary).arg("-y");

        // Seeking before -i is a fast keyframe seek.
        if task.trim_start > 0.0 {
            spec = spec.arg("-ss").arg(fmt_seconds(task.trim_start));
        }

        spec = spec.arg("-i").arg(task.source.to_string_lossy());

        // "Drop N seconds from the end" needs the probed total; without it
        // the encode runs to the end of the source.
        if task.trim_end > 0.0 && total_duration > 0.0 {
            let keep = total_duration - task.trim_start - task.trim_end;
            if keep > 0.0 {
                spec = spec.arg("-t").arg(fmt_seconds(keep));
            }
        }

        // Both containers get the same re-encode; stream copy would bypass
        // the filter chain entirely.
        spec = spec
            .arg("-c:v")
            .arg("libx264")
            .arg("-c:a")
            .arg("aac")
            .arg("-crf")
            .arg(task.crf.to_string())
            .arg("-preset")
            .arg(&task.preset);

        let filters = self.filter_chain();
        if !filters.is_empty() {
            spec = spec.arg("-vf").arg(filters.join(","));
        }

        spec.arg(task.output.to_string_lossy())
    }

    /// Video filters in their fixed order: stabilization transform first,
    /// then rotation.
    fn filter_chain(&self) -> Vec<String> {
        let task = self.task;
        let mut filters = Vec::new();

        if task.stabilization > 0 {
            let trf = escape_filter_path(&self.transform_file());
            filters.push(format!(
                "vidstabtransform=input='{trf}':smoothing={}",
                task.stabilization
            ));
        }

        match task.rotation {
            Rotation::None => {}
            Rotation::Left90 => filters.push("transpose=2".to_string()),
            Rotation::Right90 => filters.push("transpose=1".to_string()),
            Rotation::Flip180 => {
                filters.push("transpose=2".to_string());
                filters.push("transpose=2".to_string());
            }
        }

        filters
    }
}

/// Make a path safe for embedding in a filter string: forward slashes only,
/// and colons (filter option separators, e.g. in `C:/...`) escaped.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace(':', "\\:")
}

/// Seconds as an argument string, without a trailing `.0` for whole values.
fn fmt_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as i64)
    } else {
        format!("{secs}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ContainerFormat, QualityTier, Rotation, Task};

    fn task() -> Task {
        Task::new(
            "/videos/clip.mov",
            "/out/clip_Balanced.mp4",
            ContainerFormat::Mp4,
            QualityTier::Balanced,
        )
    }

    fn builder_args(task: &Task, total: f64) -> Vec<String> {
        CommandBuilder::new(Path::new("ffmpeg"), task).encode_spec(total).args
    }

    #[test]
    fn test_probe_spec_shape() {
        let task = task();
        let spec = CommandBuilder::new(Path::new("ffmpeg"), &task).probe_spec();
        assert_eq!(spec.args, vec!["-i", "/videos/clip.mov"]);
    }

    #[test]
    fn test_encode_spec_basic() {
        let task = task();
        let args = builder_args(&task, 20.0);
        assert_eq!(
            args,
            vec![
                "-y",
                "-i",
                "/videos/clip.mov",
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-crf",
                "23",
                "-preset",
                "medium",
                "/out/clip_Balanced.mp4",
            ]
        );
    }

    #[test]
    fn test_trim_duration_cap() {
        let task = task().with_trim(2.0, 3.0);
        let args = builder_args(&task, 20.0);

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "2");
        // -ss is an input option: it must precede -i.
        assert!(ss < args.iter().position(|a| a == "-i").unwrap());

        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "15");
    }

    #[test]
    fn test_no_cap_without_trim_end() {
        let task = task().with_trim(2.0, 0.0);
        let args = builder_args(&task, 20.0);
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_no_cap_with_unknown_duration() {
        let task = task().with_trim(2.0, 3.0);
        let args = builder_args(&task, 0.0);
        assert!(!args.contains(&"-t".to_string()));
        // The fast start seek still applies.
        assert!(args.contains(&"-ss".to_string()));
    }

    #[test]
    fn test_no_cap_when_trim_exceeds_duration() {
        let task = task().with_trim(10.0, 15.0);
        let args = builder_args(&task, 20.0);
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_rotation_filters() {
        let vf = |rotation| {
            let task = task().with_rotation(rotation);
            let args = builder_args(&task, 0.0);
            args.iter()
                .position(|a| a == "-vf")
                .map(|i| args[i + 1].clone())
        };

        assert_eq!(vf(Rotation::None), None);
        assert_eq!(vf(Rotation::Left90), Some("transpose=2".to_string()));
        assert_eq!(vf(Rotation::Right90), Some("transpose=1".to_string()));
        assert_eq!(
            vf(Rotation::Flip180),
            Some("transpose=2,transpose=2".to_string())
        );
    }

    #[test]
    fn test_analysis_only_with_stabilization() {
        let plain = task();
        assert!(CommandBuilder::new(Path::new("ffmpeg"), &plain)
            .analysis_spec()
            .is_none());

        let stabilized = task().with_stabilization(12);
        let spec = CommandBuilder::new(Path::new("ffmpeg"), &stabilized)
            .analysis_spec()
            .unwrap();
        let vf = &spec.args[spec.args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert!(vf.starts_with("vidstabdetect=result='"));
        assert!(vf.contains(&format!("{}_stab.trf", stabilized.id)));
        // Analysis discards its output.
        assert_eq!(spec.args[spec.args.len() - 2..], ["null", "-"]);
    }

    #[test]
    fn test_stabilization_filter_precedes_rotation() {
        let task = task().with_stabilization(8).with_rotation(Rotation::Right90);
        let args = builder_args(&task, 0.0);
        let vf = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        let stab = vf.find("vidstabtransform").unwrap();
        let rot = vf.find("transpose=1").unwrap();
        assert!(stab < rot);
        assert!(vf.contains("smoothing=8"));
    }

    #[test]
    fn test_transform_file_scoped_by_task_id() {
        let a = task().with_stabilization(5);
        let b = task().with_stabilization(5);
        let trf_a = CommandBuilder::new(Path::new("ffmpeg"), &a).transform_file();
        let trf_b = CommandBuilder::new(Path::new("ffmpeg"), &b).transform_file();
        assert_ne!(trf_a, trf_b);
        assert_eq!(trf_a.parent(), Some(Path::new("/out")));
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("C:\\work\\out\\x_stab.trf")),
            "C\\:/work/out/x_stab.trf"
        );
        assert_eq!(escape_filter_path(Path::new("/plain/path.trf")), "/plain/path.trf");
    }

    #[test]
    fn test_fmt_seconds() {
        assert_eq!(fmt_seconds(2.0), "2");
        assert_eq!(fmt_seconds(15.0), "15");
        assert_eq!(fmt_seconds(1.5), "1.5");
    }
}
