//! Touch trace reader.
//!
//! A trace is a plain text file with one pointer sample per line:
//!
//! ```text
//! # t_ms  phase  x      y      [contacts]
//! 0       down   120.0  340.0
//! 16      move   124.5  338.0
//! 32      up     124.5  338.0
//! 400     down   90     90     2
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.  `contacts` defaults
//! to 1.  Timestamps must never decrease, mirroring the guarantee a real
//! input surface gives.

use std::io::BufRead;

use remoteplay_core::{Phase, PointerSample, Timestamp};
use thiserror::Error;

/// Errors produced while reading a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("line {line}: timestamp {current} is earlier than {previous}")]
    NonMonotonic {
        line: usize,
        previous: Timestamp,
        current: Timestamp,
    },
}

/// Parses one non-comment trace line.
///
/// # Errors
///
/// Returns [`TraceError::Parse`] naming `line` when a field is missing,
/// unknown or not a number.
pub fn parse_sample(line: usize, text: &str) -> Result<PointerSample, TraceError> {
    let err = |reason: String| TraceError::Parse { line, reason };
    let mut fields = text.split_whitespace();
    let mut next = |name: &str| fields.next().ok_or_else(|| err(format!("missing {name}")));

    let t_ms = next("timestamp")?;
    let phase = next("phase")?;
    let x = next("x")?;
    let y = next("y")?;
    let contacts = fields.next();
    if let Some(extra) = fields.next() {
        return Err(err(format!("unexpected trailing field {extra:?}")));
    }

    let t_ms: u64 = t_ms
        .parse()
        .map_err(|_| err(format!("invalid timestamp {t_ms:?}")))?;
    let phase = match phase.to_ascii_lowercase().as_str() {
        "down" => Phase::Down,
        "move" => Phase::Move,
        "up" => Phase::Up,
        other => return Err(err(format!("unknown phase {other:?}"))),
    };
    let x: f32 = x.parse().map_err(|_| err(format!("invalid x {x:?}")))?;
    let y: f32 = y.parse().map_err(|_| err(format!("invalid y {y:?}")))?;
    let contacts: u8 = match contacts {
        None => 1,
        Some(c) => c
            .parse()
            .map_err(|_| err(format!("invalid contact count {c:?}")))?,
    };
    if contacts == 0 {
        return Err(err("contact count must be at least 1".to_string()));
    }

    Ok(PointerSample::new(
        Timestamp::from_millis(t_ms),
        phase,
        x,
        y,
        contacts,
    ))
}

/// Reads a whole trace.
///
/// # Errors
///
/// Returns the first I/O, parse or ordering error encountered.
pub fn read_trace<R: BufRead>(reader: R) -> Result<Vec<PointerSample>, TraceError> {
    let mut samples: Vec<PointerSample> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let sample = parse_sample(line_no, text)?;
        if let Some(previous) = samples.last() {
            if sample.timestamp < previous.timestamp {
                return Err(TraceError::NonMonotonic {
                    line: line_no,
                    previous: previous.timestamp,
                    current: sample.timestamp,
                });
            }
        }
        samples.push(sample);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_trace_skips_comments_and_blank_lines() {
        // Arrange
        let trace = "# header\n\n0 down 10 20\n16 move 12.5 21\n32 up 12.5 21\n";

        // Act
        let samples = read_trace(trace.as_bytes()).expect("valid trace");

        // Assert
        assert_eq!(
            samples,
            vec![
                PointerSample::down(0, 10.0, 20.0),
                PointerSample::moved(16, 12.5, 21.0),
                PointerSample::up(32, 12.5, 21.0),
            ]
        );
    }

    #[test]
    fn test_parse_sample_reads_optional_contact_count() {
        let sample = parse_sample(1, "400 DOWN 90 90 2").unwrap();
        assert_eq!(sample.contacts, 2);
        assert_eq!(sample.phase, Phase::Down);
    }

    #[test]
    fn test_parse_sample_reports_line_number_for_unknown_phase() {
        let err = parse_sample(7, "0 hover 1 1").unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 7, .. }));
        assert!(err.to_string().contains("hover"));
    }

    #[test]
    fn test_parse_sample_rejects_missing_and_extra_fields() {
        assert!(matches!(
            parse_sample(1, "0 down 1"),
            Err(TraceError::Parse { .. })
        ));
        assert!(matches!(
            parse_sample(1, "0 down 1 1 1 9"),
            Err(TraceError::Parse { .. })
        ));
        assert!(matches!(
            parse_sample(1, "0 down 1 1 0"),
            Err(TraceError::Parse { .. })
        ));
    }

    #[test]
    fn test_read_trace_rejects_decreasing_timestamps() {
        let trace = "10 down 0 0\n5 up 0 0\n";

        let err = read_trace(trace.as_bytes()).unwrap_err();

        assert!(matches!(err, TraceError::NonMonotonic { line: 2, .. }));
    }
}
