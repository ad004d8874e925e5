//! Live frame capture from a byte-stream port.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use time::OffsetDateTime;

use super::{FrameEvent, FrameSource, SourceError, strip_rssi};

const READ_CHUNK: usize = 512;

/// Lines that never terminate are garbage, not frames.
const MAX_LINE_BYTES: usize = 1024;

/// Reads newline-delimited frames from a live byte stream.
///
/// The reader is expected to be configured with a read timeout; timed
/// out reads surface as [`FrameEvent::IdleTimeout`] so the caller can
/// poll its stop flag. Candidates are stamped with the wall-clock time
/// the terminating newline arrived.
///
/// Stopping is cooperative: flip the flag from [`PortSource::stop_flag`]
/// and the source drains lines already buffered before reporting end of
/// input, so frames received ahead of the stop are never dropped.
pub struct PortSource<R: Read> {
    port: R,
    buf: Vec<u8>,
    stop: Arc<AtomicBool>,
    stopped: bool,
}

impl<R: Read> PortSource<R> {
    pub fn new(port: R) -> Self {
        Self {
            port,
            buf: Vec::with_capacity(READ_CHUNK),
            stop: Arc::new(AtomicBool::new(false)),
            stopped: false,
        }
    }

    /// Handle for requesting shutdown from another thread.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Take the next complete non-blank line out of the buffer, if any.
    fn buffered_line(&mut self) -> Option<FrameEvent> {
        let raw = loop {
            let pos = self.buf.iter().position(|&b| b == b'\n')?;
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            if !raw.iter().all(|b| b.is_ascii_whitespace()) {
                break raw;
            }
        };
        let raw = &raw[..raw.len() - 1];
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let Ok(text) = std::str::from_utf8(raw) else {
            return Some(FrameEvent::Malformed {
                text: String::from_utf8_lossy(raw).into_owned(),
                reason: "invalid utf-8".to_string(),
            });
        };
        Some(FrameEvent::Candidate {
            ts: OffsetDateTime::now_utc(),
            text: strip_rssi(text).to_string(),
        })
    }
}

impl<R: Read> FrameSource for PortSource<R> {
    fn next_event(&mut self) -> Result<Option<FrameEvent>, SourceError> {
        loop {
            if let Some(event) = self.buffered_line() {
                return Ok(Some(event));
            }
            if self.stopped {
                return Ok(None);
            }
            if self.stop.load(Ordering::Relaxed) {
                // Drain what already arrived, then finish.
                self.stopped = true;
                continue;
            }
            if self.buf.len() > MAX_LINE_BYTES {
                let overflow: Vec<u8> = self.buf.drain(..).collect();
                return Ok(Some(FrameEvent::Malformed {
                    text: String::from_utf8_lossy(&overflow).into_owned(),
                    reason: "line exceeds maximum length".to_string(),
                }));
            }
            let mut chunk = [0u8; READ_CHUNK];
            match self.port.read(&mut chunk) {
                Ok(0) => {
                    self.stopped = true;
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(err) => match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                        return Ok(Some(FrameEvent::IdleTimeout));
                    }
                    io::ErrorKind::Interrupted => continue,
                    _ => return Err(SourceError::Io(err)),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use super::*;

    /// Scripted reader: each step is either bytes or an error kind.
    struct Script(Vec<Result<Vec<u8>, io::ErrorKind>>);

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            match self.0.remove(0) {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.0.insert(0, Ok(bytes[n..].to_vec()));
                    }
                    Ok(n)
                }
                Err(kind) => Err(io::Error::new(kind, "scripted")),
            }
        }
    }

    #[test]
    fn lines_split_across_reads_are_reassembled() {
        let mut source = PortSource::new(Script(vec![
            Ok(b"I 01:123456 --:--".to_vec()),
            Ok(b"---- 1F09 003 FF04B5 A9\r\n".to_vec()),
        ]));
        let event = source.next_event().unwrap().unwrap();
        assert!(matches!(event, FrameEvent::Candidate { text, .. }
            if text == "I 01:123456 --:------ 1F09 003 FF04B5 A9"));
        assert_eq!(source.next_event().unwrap(), None);
    }

    #[test]
    fn timeouts_surface_as_idle_events() {
        let mut source = PortSource::new(Script(vec![
            Err(io::ErrorKind::TimedOut),
            Ok(b"RQ 18:000730 01:123456 1F09 001 00 6C\n".to_vec()),
        ]));
        assert_eq!(source.next_event().unwrap(), Some(FrameEvent::IdleTimeout));
        assert!(matches!(
            source.next_event().unwrap(),
            Some(FrameEvent::Candidate { .. })
        ));
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut source = PortSource::new(Script(vec![
            Err(io::ErrorKind::Interrupted),
            Ok(b"RQ 18:000730 01:123456 1F09 001 00 6C\n".to_vec()),
        ]));
        assert!(matches!(
            source.next_event().unwrap(),
            Some(FrameEvent::Candidate { .. })
        ));
    }

    #[test]
    fn stop_drains_buffered_lines_first() {
        let mut source = PortSource::new(Script(vec![Ok(
            b"RQ 18:000730 01:123456 1F09 001 00 6C\nRP 01:123456 18:000730 1F09 003 FF04B5 11\n"
                .to_vec(),
        )]));
        let first = source.next_event().unwrap();
        assert!(matches!(first, Some(FrameEvent::Candidate { .. })));
        source.stop_flag().store(true, Ordering::Relaxed);
        let second = source.next_event().unwrap();
        assert!(matches!(second, Some(FrameEvent::Candidate { .. })));
        assert_eq!(source.next_event().unwrap(), None);
    }

    #[test]
    fn oversized_lines_are_rejected_not_buffered_forever() {
        let mut junk = vec![b'A'; 2048];
        junk.push(b'\n');
        let mut source = PortSource::new(Script(vec![
            Ok(junk[..600].to_vec()),
            Ok(junk[600..1200].to_vec()),
            Ok(junk[1200..].to_vec()),
        ]));
        let event = source.next_event().unwrap().unwrap();
        assert!(matches!(event, FrameEvent::Malformed { reason, .. }
            if reason.contains("maximum length")));
    }
}
