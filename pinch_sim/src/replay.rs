//! Recorded frame replay.
//!
//! Recordings are JSON lines, one `Frame` per line. Blank lines are skipped.

use crate::runner::Schedule;
use pinch_core::Frame;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid frame: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads every frame of a JSON-lines recording.
pub fn load_frames(path: impl AsRef<Path>) -> Result<Vec<Frame>, ReplayError> {
    let file = File::open(path)?;
    parse_frames(BufReader::new(file))
}

pub fn parse_frames<R: BufRead>(reader: R) -> Result<Vec<Frame>, ReplayError> {
    let mut frames = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
            line: index + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Paces frames by their recorded timestamps.
///
/// The wait after each frame is the gap to the next frame's `timestamp_us`.
/// Missing or non-increasing timestamps, and the last frame, fall back to
/// `default_interval`.
pub fn schedule(frames: Vec<Frame>, default_interval: Duration) -> Schedule {
    let next_stamps: Vec<Option<i64>> = frames
        .iter()
        .skip(1)
        .map(|frame| Some(frame.timestamp_us))
        .chain(std::iter::once(None))
        .collect();

    frames
        .into_iter()
        .zip(next_stamps)
        .map(|(frame, next)| {
            let wait = match next {
                Some(next) if next > frame.timestamp_us => {
                    Duration::from_micros((next - frame.timestamp_us) as u64)
                }
                _ => default_interval,
            };
            (frame, wait)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = r#"{"id":1,"timestamp_us":1000,"samples":[{"id":10,"hand_id":1,"tip_position":[0.0,200.0,0.0]}]}

{"id":2,"timestamp_us":9000,"samples":[]}
{"id":3,"samples":[]}
"#;

    #[test]
    fn test_parse_frames_skips_blank_lines() {
        let frames = parse_frames(RECORDING.as_bytes()).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].samples[0].id, 10);
        assert_eq!(frames[2].timestamp_us, 0);
    }

    #[test]
    fn test_parse_error_reports_line_number() {
        let input = "{\"id\":1,\"samples\":[]}\nnot json\n";
        let err = parse_frames(input.as_bytes()).unwrap_err();

        assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_schedule_uses_timestamp_deltas() {
        let frames = parse_frames(RECORDING.as_bytes()).unwrap();
        let waits: Vec<Duration> = schedule(frames, Duration::from_millis(10))
            .into_iter()
            .map(|(_, wait)| wait)
            .collect();

        assert_eq!(
            waits,
            vec![
                Duration::from_micros(8000),
                // Timestamp goes backwards
                Duration::from_millis(10),
                // Last frame
                Duration::from_millis(10),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = load_frames("/nonexistent/recording.jsonl").unwrap_err();
        assert!(matches!(err, ReplayError::Io(_)));
    }
}
