//! Frame acquisition from logs and serial ports.
//!
//! Sources deliver candidate frame lines with timestamps, not parsed
//! frames. Grammar and checksum validation stay in the parser so every
//! source behaves identically downstream.

pub mod log;
pub mod port;

use std::io;

use time::OffsetDateTime;

pub use log::LogFileSource;
pub use port::PortSource;

/// One unit of input pulled from a frame source.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A line that may be a frame, stripped of transport decoration.
    Candidate { ts: OffsetDateTime, text: String },
    /// A line the source could not lift into candidate form.
    Malformed { text: String, reason: String },
    /// The underlying reader had nothing to deliver within its timeout.
    IdleTimeout,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// A pull-based producer of frame events.
pub trait FrameSource {
    /// Fetch the next event, or `None` once the source is exhausted.
    fn next_event(&mut self) -> Result<Option<FrameEvent>, SourceError>;
}

/// Drop a leading RSSI field (`045 ` or similar) some receivers prepend.
///
/// RSSI looks like a sequence token, so presence is decided by token
/// count: receivers that report signal strength always emit the
/// sequence column too, giving one token more than the grammar allows.
pub(crate) fn strip_rssi(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.split_whitespace().count() != crate::protocol::frame::layout::TOKENS_WITH_SEQ + 1 {
        return trimmed;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) if head.len() == 3 && head.bytes().all(|b| b.is_ascii_digit()) => {
            rest.trim_start()
        }
        _ => trimmed,
    }
}
