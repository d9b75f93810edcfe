//! Encoder output parsing.
//!
//! The encoder reports a total duration once per input
//! (`Duration: HH:MM:SS.ff`) and a running position repeatedly while
//! encoding (`time=HH:MM:SS.ff`). Everything here is plain substring
//! scanning; the lines are machine-generated and stable.

/// Parse a `HH:MM:SS.ff` clock string to seconds.
pub fn parse_time(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].trim().parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Scan probe output for the first duration marker. Returns `0.0` when none
/// is present, which downstream treats as "duration unknown" rather than an
/// error.
pub fn parse_duration(output: &str) -> f64 {
    output
        .lines()
        .find_map(duration_in_line)
        .unwrap_or(0.0)
}

fn duration_in_line(line: &str) -> Option<f64> {
    let start = line.find("Duration:")?;
    let rest = line[start + "Duration:".len()..].trim_start();
    let end = rest.find(',').unwrap_or(rest.len());
    parse_time(&rest[..end])
}

/// Parse the running-time field from one line of streaming encoder output
/// (e.g. `frame=  12 fps=25 ... time=00:01:30.50 bitrate=...`).
pub fn parse_time_field(line: &str) -> Option<f64> {
    let start = line.find("time=")?;
    let rest = &line[start + "time=".len()..];
    let end = rest.find(' ').unwrap_or(rest.len());
    parse_time(&rest[..end])
}

/// Convert a running position to an integer percentage of the total.
/// `None` when the total is unknown (`<= 0`): progress is indeterminate and
/// nothing should be reported, not a fabricated zero.
pub fn to_percent(current: f64, total: f64) -> Option<u8> {
    if total <= 0.0 {
        return None;
    }
    Some((current / total * 100.0).clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_valid() {
        assert_eq!(parse_time("00:00:10.50"), Some(10.5));
        assert_eq!(parse_time("01:30:00.00"), Some(5400.0));
        assert_eq!(parse_time("00:01:30.50"), Some(90.5));
        assert_eq!(parse_time("10:00:00.00"), Some(36000.0));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert_eq!(parse_time("invalid"), None);
        assert_eq!(parse_time("00:00"), None);
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("00:00:00:00"), None);
        assert_eq!(parse_time("N/A"), None);
    }

    #[test]
    fn test_parse_duration() {
        let output = "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':\n\
                      \x20 Duration: 00:00:20.00, start: 0.000000, bitrate: 1052 kb/s\n\
                      \x20   Stream #0:0(und): Video: h264 (High)";
        assert_eq!(parse_duration(output), 20.0);
    }

    #[test]
    fn test_parse_duration_missing_is_zero() {
        assert_eq!(parse_duration("no duration marker here"), 0.0);
        assert_eq!(parse_duration(""), 0.0);
    }

    #[test]
    fn test_parse_duration_not_applicable() {
        // Piped inputs sometimes report "Duration: N/A".
        assert_eq!(parse_duration("  Duration: N/A, bitrate: N/A"), 0.0);
    }

    #[test]
    fn test_parse_duration_takes_first_marker() {
        let output = "  Duration: 00:00:05.00, start: 0\n  Duration: 00:01:00.00, start: 0";
        assert_eq!(parse_duration(output), 5.0);
    }

    #[test]
    fn test_parse_time_field() {
        let line = "frame=  100 fps=25 q=28.0 size=     256kB time=00:00:04.00 bitrate= 524.3kbits/s speed=10x";
        assert_eq!(parse_time_field(line), Some(4.0));
    }

    #[test]
    fn test_parse_time_field_at_line_end() {
        assert_eq!(parse_time_field("time=00:00:10.00"), Some(10.0));
    }

    #[test]
    fn test_parse_time_field_absent() {
        assert_eq!(parse_time_field("frame=100 fps=25 q=-1.0"), None);
        assert_eq!(parse_time_field(""), None);
    }

    #[test]
    fn test_to_percent() {
        assert_eq!(to_percent(5.0, 20.0), Some(25));
        assert_eq!(to_percent(20.0, 20.0), Some(100));
        assert_eq!(to_percent(0.0, 20.0), Some(0));
    }

    #[test]
    fn test_to_percent_clamps_overshoot() {
        // The last progress line can overshoot the probed duration slightly.
        assert_eq!(to_percent(21.5, 20.0), Some(100));
    }

    #[test]
    fn test_to_percent_unknown_total() {
        assert_eq!(to_percent(5.0, 0.0), None);
        assert_eq!(to_percent(5.0, -1.0), None);
    }
}
