//! Wire grammar constants and the checksum algorithm (source of truth).
//!
//! A candidate frame is a whitespace-separated token sequence:
//!
//! ```text
//! <seq?> <verb> <src-addr> <dst-addr> <code> <len> <payload> <checksum>
//! ```
//!
//! The sequence token is optional; `---` stands for "no sequence number".

use crate::protocol::device::Address;

pub const SEQ_NONE_TOKEN: &str = "---";
pub const SEQ_WIDTH: usize = 3;
pub const CODE_WIDTH: usize = 4;

/// Token count without a sequence marker.
pub const TOKENS_WITHOUT_SEQ: usize = 7;
/// Token count with a sequence marker.
pub const TOKENS_WITH_SEQ: usize = 8;

/// Packets never carry more than 48 payload bytes.
pub const MAX_PAYLOAD_BYTES: usize = 48;

/// Verb wire codes, as summed into the checksum.
pub const VERB_RQ: u8 = 0x00;
pub const VERB_I: u8 = 0x01;
pub const VERB_W: u8 = 0x02;
pub const VERB_RP: u8 = 0x03;

/// Compute the frame checksum: the two's complement of the byte sum of
/// the sequence marker (0 when absent), verb code, packed source and
/// destination addresses, code (be16), payload length, and payload bytes.
/// A frame is intact when the sum including the checksum is 0 modulo 256.
pub fn checksum(
    seq: Option<u8>,
    verb_code: u8,
    src: &Address,
    dst: &Address,
    code: u16,
    payload: &[u8],
) -> u8 {
    let mut sum = seq.unwrap_or(0) as u32 + verb_code as u32;
    for byte in src.packed() {
        sum += byte as u32;
    }
    for byte in dst.packed() {
        sum += byte as u32;
    }
    let code = code.to_be_bytes();
    sum += code[0] as u32 + code[1] as u32;
    sum += payload.len() as u32;
    for byte in payload {
        sum += *byte as u32;
    }
    (sum as u8).wrapping_neg()
}
