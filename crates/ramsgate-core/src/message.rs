use serde_json::Value;
use time::OffsetDateTime;

use crate::protocol::codec::CodecTable;
use crate::protocol::device::{Address, DeviceClass};
use crate::protocol::frame::{Code, Frame, ParseError, Verb, reader::to_hex};

/// A decoded payload, or the raw bytes when no codec applies.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Decoded(Value),
    /// Unknown code or out-of-domain value; kept verbatim so forward
    /// compatibility never halts the pipeline.
    Opaque(Vec<u8>),
}

impl Payload {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Opaque(_) => None,
        }
    }

    pub fn raw_hex(&self) -> Option<String> {
        match self {
            Self::Decoded(_) => None,
            Self::Opaque(bytes) => Some(to_hex(bytes)),
        }
    }
}

/// A decoded, semantically typed frame with its receipt timestamp.
///
/// Addresses are lookup keys into the device registry, not owning
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub ts: OffsetDateTime,
    pub seq: Option<u8>,
    pub verb: Verb,
    pub src: Address,
    pub dst: Address,
    pub code: Code,
    pub payload: Payload,
}

impl Message {
    /// Assemble a message from a validated frame.
    ///
    /// The payload decoder is looked up by (code, source device class)
    /// with wildcard fallback. An absent codec or an out-of-domain value
    /// yields an opaque payload; only a table length mismatch rejects the
    /// frame.
    pub fn from_frame(
        frame: Frame,
        ts: OffsetDateTime,
        table: &CodecTable,
    ) -> Result<Self, ParseError> {
        let class = DeviceClass::from_address(&frame.src);
        let payload = match table.lookup(frame.code, class) {
            None => Payload::Opaque(frame.payload.clone()),
            Some(entry) => {
                if let Some(expected) = entry.expected_len {
                    if frame.payload.len() != expected {
                        return Err(ParseError::LengthMismatch {
                            declared: expected,
                            actual: frame.payload.len(),
                        });
                    }
                }
                match (entry.decode)(&frame.payload) {
                    Ok(value) => Payload::Decoded(value),
                    Err(err) => {
                        tracing::debug!(code = %frame.code, %err, "payload kept opaque");
                        Payload::Opaque(frame.payload.clone())
                    }
                }
            }
        };
        Ok(Self {
            ts,
            seq: frame.seq,
            verb: frame.verb,
            src: frame.src,
            dst: frame.dst,
            code: frame.code,
            payload,
        })
    }
}
