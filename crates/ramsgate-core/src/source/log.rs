//! Replay of captured frame traffic from packet log files.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use time::format_description::FormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::{FrameEvent, FrameSource, SourceError, strip_rssi};

/// `2021-01-01 12:00:00.123456` style stamps, taken as UTC.
const LOG_STAMP: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// Replays a packet log, one candidate per timestamped line.
///
/// Lines carry a leading timestamp (RFC 3339 or the space-separated
/// log-file form) followed by the frame text. Undecodable lines come
/// back as [`FrameEvent::Malformed`] so callers can count them; blank
/// lines are skipped outright.
pub struct LogFileSource<R: Read> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl LogFileSource<File> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> LogFileSource<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: BufReader::new(input),
            buf: Vec::with_capacity(256),
        }
    }

    fn lift(line: &str) -> FrameEvent {
        match split_stamp(line) {
            Some((ts, rest)) => FrameEvent::Candidate {
                ts,
                text: strip_rssi(rest).to_string(),
            },
            None => FrameEvent::Malformed {
                text: line.to_string(),
                reason: "missing or invalid timestamp".to_string(),
            },
        }
    }
}

/// Split a log line into its timestamp and the remaining frame text.
fn split_stamp(line: &str) -> Option<(OffsetDateTime, &str)> {
    let (first, rest) = line.split_once(char::is_whitespace)?;
    if first.contains('T') {
        let ts = OffsetDateTime::parse(first, &Rfc3339).ok()?;
        return Some((ts, rest.trim_start()));
    }
    let rest = rest.trim_start();
    let (second, tail) = rest.split_once(char::is_whitespace)?;
    let stamp = format!("{first} {second}");
    let ts = PrimitiveDateTime::parse(&stamp, LOG_STAMP).ok()?.assume_utc();
    Some((ts, tail.trim_start()))
}

impl<R: Read> FrameSource for LogFileSource<R> {
    fn next_event(&mut self) -> Result<Option<FrameEvent>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            let Ok(line) = std::str::from_utf8(&self.buf) else {
                return Ok(Some(FrameEvent::Malformed {
                    text: String::from_utf8_lossy(&self.buf).into_owned(),
                    reason: "invalid utf-8".to_string(),
                }));
            };
            let line = line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(Self::lift(line)));
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn drain(input: &str) -> Vec<FrameEvent> {
        let mut source = LogFileSource::new(input.as_bytes());
        let mut events = Vec::new();
        while let Some(event) = source.next_event().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn log_form_timestamp_is_parsed_as_utc() {
        let events = drain("2021-01-01 12:00:00.500 I 01:123456 --:------ 1F09 003 FF04B5 A9\n");
        assert_eq!(
            events,
            vec![FrameEvent::Candidate {
                ts: datetime!(2021-01-01 12:00:00.5 UTC),
                text: "I 01:123456 --:------ 1F09 003 FF04B5 A9".to_string(),
            }]
        );
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let events = drain("2021-06-01T08:30:00Z RQ 18:000730 01:123456 1F09 001 00 6C\n");
        assert_eq!(
            events,
            vec![FrameEvent::Candidate {
                ts: datetime!(2021-06-01 08:30 UTC),
                text: "RQ 18:000730 01:123456 1F09 001 00 6C".to_string(),
            }]
        );
    }

    #[test]
    fn rssi_prefixed_lines_are_cleaned() {
        let events =
            drain("2021-01-01 12:00:00.000 045 --- I 01:123456 --:------ 1F09 003 FF04B5 A9\n");
        match &events[0] {
            FrameEvent::Candidate { text, .. } => {
                assert_eq!(text, "--- I 01:123456 --:------ 1F09 003 FF04B5 A9");
            }
            other => panic!("expected candidate, got {other:?}"),
        }
    }

    #[test]
    fn unstamped_lines_become_malformed_events() {
        let events = drain("garbage without a stamp\n\n  \n");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], FrameEvent::Malformed { reason, .. }
            if reason.contains("timestamp")));
    }

    #[test]
    fn invalid_utf8_is_reported_not_fatal() {
        let mut bytes = b"2021-01-01 12:00:00.000 I \xFF\xFE\n".to_vec();
        bytes.extend_from_slice(b"2021-01-01 12:00:00.000 RQ 18:000730 01:123456 1F09 001 00 6C\n");
        let mut source = LogFileSource::new(bytes.as_slice());
        let first = source.next_event().unwrap().unwrap();
        assert!(matches!(first, FrameEvent::Malformed { reason, .. } if reason == "invalid utf-8"));
        let second = source.next_event().unwrap().unwrap();
        assert!(matches!(second, FrameEvent::Candidate { .. }));
    }

    #[test]
    fn missing_trailing_newline_still_yields_a_line() {
        let events = drain("2021-01-01 12:00:00.000 RQ 18:000730 01:123456 1F09 001 00 6C");
        assert_eq!(events.len(), 1);
    }
}
