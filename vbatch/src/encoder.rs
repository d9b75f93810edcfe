//! Encoder binary discovery.
//!
//! A bundled `ffmpeg` sitting next to the current executable wins over
//! whatever is on `PATH`, so packaged installs do not depend on the host
//! environment.

use std::path::{Path, PathBuf};

use tracing::debug;

#[cfg(windows)]
const BINARY_NAME: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "ffmpeg";

/// Resolve the encoder binary: bundled copy first, bare command name on
/// `PATH` as the fallback.
pub fn resolve_encoder() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let bundled = dir.join(BINARY_NAME);
            if bundled.is_file() {
                debug!("using bundled encoder at {}", bundled.display());
                return bundled;
            }
        }
    }
    PathBuf::from(BINARY_NAME)
}

/// First line of `<binary> -version`, or `None` if the binary does not run.
pub fn detect_version(binary: &Path) -> Option<String> {
    std::process::Command::new(binary)
        .arg("-version")
        .output()
        .ok()
        .and_then(|output| {
            String::from_utf8(output.stdout)
                .ok()
                .and_then(|s| s.lines().next().map(|l| l.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_path_lookup() {
        // No bundled binary ships with the test executable, so resolution
        // degrades to the bare command name.
        assert_eq!(resolve_encoder(), PathBuf::from(BINARY_NAME));
    }

    #[test]
    fn test_detect_version_missing_binary() {
        assert_eq!(detect_version(Path::new("/nonexistent/ffmpeg")), None);
    }
}
