use super::error::ParseError;
use super::layout;
use super::reader::{FrameReader, parse_decimal, parse_hex_byte, parse_hex_bytes};
use super::{Code, Frame, Verb};
use crate::protocol::device::Address;

/// Parse one candidate line into a [`Frame`].
///
/// Pure: validates token structure, declared payload length, and the
/// checksum. Device-state mutation happens downstream, never here.
pub fn parse_frame(text: &str) -> Result<Frame, ParseError> {
    let reader = FrameReader::new(text);
    let (seq, base) = match reader.token_count() {
        layout::TOKENS_WITHOUT_SEQ => (None, 0),
        layout::TOKENS_WITH_SEQ => (parse_seq(reader.token(0)?)?, 1),
        count => {
            return Err(ParseError::Malformed {
                reason: format!("expected 7 or 8 tokens, got {count}"),
            });
        }
    };

    let verb_token = reader.token(base)?;
    let Some(verb) = Verb::from_token(verb_token) else {
        // An unknown verb only means something when the rest of the
        // line still reads as a frame; otherwise it is plain garbage.
        return Err(if frame_shaped(&reader, base) {
            ParseError::UnknownVerb {
                token: verb_token.to_string(),
            }
        } else {
            ParseError::Malformed {
                reason: format!("not a frame: {verb_token}"),
            }
        });
    };

    let src = parse_address(reader.token(base + 1)?)?;
    let dst = parse_address(reader.token(base + 2)?)?;

    let code_token = reader.token(base + 3)?;
    let code = Code::parse(code_token).ok_or_else(|| ParseError::Malformed {
        reason: format!("bad message code: {code_token}"),
    })?;

    let declared = parse_decimal(reader.token(base + 4)?)?;
    if declared == 0 || declared > layout::MAX_PAYLOAD_BYTES {
        return Err(ParseError::Malformed {
            reason: format!("payload length out of range: {declared}"),
        });
    }

    let payload = parse_hex_bytes(reader.token(base + 5)?)?;
    if payload.len() != declared {
        return Err(ParseError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }

    let actual = parse_hex_byte(reader.token(base + 6)?)?;
    let expected = layout::checksum(seq, verb.wire_code(), &src, &dst, code.0, &payload);
    if actual != expected {
        return Err(ParseError::ChecksumFailed { expected, actual });
    }

    Ok(Frame {
        seq,
        verb,
        src,
        dst,
        code,
        payload,
        checksum: actual,
    })
}

/// Both addresses and the code parse, so the token layout is frame-like.
fn frame_shaped(reader: &FrameReader<'_>, base: usize) -> bool {
    let addr = |idx: usize| matches!(reader.token(idx), Ok(token) if Address::parse(token).is_some());
    addr(base + 1)
        && addr(base + 2)
        && matches!(reader.token(base + 3), Ok(token) if Code::parse(token).is_some())
}

fn parse_seq(token: &str) -> Result<Option<u8>, ParseError> {
    if token == layout::SEQ_NONE_TOKEN {
        return Ok(None);
    }
    if token.len() != layout::SEQ_WIDTH {
        return Err(ParseError::Malformed {
            reason: format!("bad sequence marker: {token}"),
        });
    }
    token
        .parse::<u8>()
        .map(Some)
        .map_err(|_| ParseError::Malformed {
            reason: format!("bad sequence marker: {token}"),
        })
}

fn parse_address(token: &str) -> Result<Address, ParseError> {
    Address::parse(token).ok_or_else(|| ParseError::BadAddress {
        token: token.to_string(),
    })
}
