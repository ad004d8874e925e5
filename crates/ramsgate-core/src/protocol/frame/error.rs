use thiserror::Error;

/// Errors returned by candidate-frame parsing.
///
/// All variants are recoverable at the pipeline level: the frame is
/// dropped and counted, never partially applied.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed frame: {reason}")]
    Malformed { reason: String },
    #[error("bad address token: {token}")]
    BadAddress { token: String },
    #[error("unknown verb: {token}")]
    UnknownVerb { token: String },
    #[error("length mismatch: declared {declared} bytes, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("checksum failed: expected {expected:02X}, got {actual:02X}")]
    ChecksumFailed { expected: u8, actual: u8 },
}
