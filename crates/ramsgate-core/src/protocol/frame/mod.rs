//! Candidate frame text → validated [`Frame`].
//!
//! Layered like the other protocol areas: `layout` holds the wire grammar
//! and checksum constants, `reader` safe token access, `parser` the
//! domain-level decoding, `error` the explicit error set.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

use std::fmt;

pub use error::ParseError;
pub use parser::parse_frame;

use crate::protocol::device::Address;

/// Frame verb: read request, read response, notification, or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Info,
    ReadRequest,
    ReadResponse,
    Write,
}

impl Verb {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "I" => Some(Self::Info),
            "RQ" => Some(Self::ReadRequest),
            "RP" => Some(Self::ReadResponse),
            "W" => Some(Self::Write),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Info => "I",
            Self::ReadRequest => "RQ",
            Self::ReadResponse => "RP",
            Self::Write => "W",
        }
    }

    /// Numeric code summed into the checksum.
    pub fn wire_code(&self) -> u8 {
        match self {
            Self::ReadRequest => layout::VERB_RQ,
            Self::Info => layout::VERB_I,
            Self::Write => layout::VERB_W,
            Self::ReadResponse => layout::VERB_RP,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.token())
    }
}

/// Four-hex-digit message-type code, e.g. `1F09`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(pub u16);

impl Code {
    pub const SYNC_CYCLE: Code = Code(0x1F09);
    pub const RELAY_DEMAND: Code = Code(0x0008);
    pub const DHW_TEMP: Code = Code(0x1260);
    pub const WINDOW_STATE: Code = Code(0x12B0);
    pub const SETPOINT: Code = Code(0x2309);
    pub const SYSTEM_MODE: Code = Code(0x2E04);
    pub const ZONE_TEMP: Code = Code(0x30C9);
    pub const HEAT_DEMAND: Code = Code(0x3150);
    pub const ACTUATOR_STATE: Code = Code(0x3EF0);

    pub fn parse(token: &str) -> Option<Self> {
        if token.len() != layout::CODE_WIDTH {
            return None;
        }
        u16::from_str_radix(token, 16).ok().map(Code)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// One validated wire transmission.
///
/// Construction via [`Frame::new`] computes the checksum; frames obtained
/// from [`parse_frame`] have already had theirs verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: Option<u8>,
    pub verb: Verb,
    pub src: Address,
    pub dst: Address,
    pub code: Code,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl Frame {
    pub fn new(
        seq: Option<u8>,
        verb: Verb,
        src: Address,
        dst: Address,
        code: Code,
        payload: Vec<u8>,
    ) -> Self {
        let checksum = layout::checksum(seq, verb.wire_code(), &src, &dst, code.0, &payload);
        Self {
            seq,
            verb,
            src,
            dst,
            code,
            payload,
            checksum,
        }
    }

    /// Render the canonical wire text, ready for transport write.
    pub fn canonical(&self) -> String {
        let seq = match self.seq {
            Some(seq) => format!("{seq:03}"),
            None => layout::SEQ_NONE_TOKEN.to_string(),
        };
        format!(
            "{seq} {:>2} {} {} {} {:03} {} {:02X}",
            self.verb,
            self.src,
            self.dst,
            self.code,
            self.payload.len(),
            reader::to_hex(&self.payload),
            self.checksum,
        )
    }
}
