//! Batch expansion.
//!
//! Turns the command line's source files and selected formats/qualities
//! into one task per (source, format, quality) combination, with
//! collision-free output names under the shared suffix convention.

use std::path::Path;

use anyhow::bail;

use vbatch::Task;

use crate::args::Args;

/// Expand the argument set into concrete tasks.
pub fn expand_tasks(args: &Args) -> anyhow::Result<Vec<Task>> {
    let formats = dedup(&args.format);
    let qualities = dedup(&args.quality);

    let mut tasks = Vec::new();
    for source in &args.inputs {
        if !source.is_file() {
            bail!("source file not found: {}", source.display());
        }
        let out_dir = match &args.output_dir {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
        };

        for &format in &formats {
            for &quality in &qualities {
                let output = out_dir.join(Task::output_file_name(source, quality, format));
                if output == *source {
                    bail!(
                        "output would overwrite its own source: {}",
                        output.display()
                    );
                }
                tasks.push(
                    Task::new(source, output, format, quality)
                        .with_rotation(args.rotate)
                        .with_trim(args.trim_start, args.trim_end)
                        .with_stabilization(args.stabilize),
                );
            }
        }
    }

    if tasks.is_empty() {
        bail!("no tasks to run");
    }
    Ok(tasks)
}

fn dedup<T: Copy + PartialEq>(values: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(values.len());
    for &value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn args(extra: &[&str], source: &Path) -> Args {
        let mut argv = vec!["vbatch"];
        argv.extend_from_slice(extra);
        let source = source.to_str().unwrap();
        argv.push(source);
        Args::parse_from(argv)
    }

    fn touch(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_one_task_per_format_quality_pair() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mov");
        let args = args(
            &["--format", "mp4,mkv", "--quality", "hd,compact"],
            &source,
        );

        let tasks = expand_tasks(&args).unwrap();
        assert_eq!(tasks.len(), 4);

        let names: Vec<String> = tasks
            .iter()
            .map(|t| t.output.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"clip_HD.mp4".to_string()));
        assert!(names.contains(&"clip_Compact.mkv".to_string()));
        // All outputs land next to the source by default.
        assert!(tasks.iter().all(|t| t.output.parent() == Some(dir.path())));
    }

    #[test]
    fn test_duplicate_selections_collapse() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mov");
        let args = args(&["--format", "mp4,mp4", "--quality", "hd,hd"], &source);
        assert_eq!(expand_tasks(&args).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_source_rejected() {
        let dir = TempDir::new().unwrap();
        let args = args(&[], &dir.path().join("absent.mp4"));
        assert!(expand_tasks(&args).is_err());
    }

    #[test]
    fn test_task_options_propagate() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip.mov");
        let args = args(
            &[
                "--rotate",
                "right90",
                "--trim-start",
                "2",
                "--trim-end",
                "3",
                "--stabilize",
                "12",
            ],
            &source,
        );

        let tasks = expand_tasks(&args).unwrap();
        let task = &tasks[0];
        assert_eq!(task.rotation, vbatch::Rotation::Right90);
        assert_eq!(task.trim_start, 2.0);
        assert_eq!(task.trim_end, 3.0);
        assert_eq!(task.stabilization, 12);
    }

    #[test]
    fn test_output_collision_with_source_rejected() {
        let dir = TempDir::new().unwrap();
        let source = touch(&dir, "clip_HD.mp4");
        let args = args(&["--quality", "hd"], &source);
        assert!(expand_tasks(&args).is_err());
    }
}
