use super::error::ParseError;

/// Safe token access over a candidate frame line.
pub struct FrameReader<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> FrameReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_whitespace().collect(),
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, index: usize) -> Result<&'a str, ParseError> {
        self.tokens.get(index).copied().ok_or(ParseError::Malformed {
            reason: format!("missing token {index}"),
        })
    }
}

pub fn parse_hex_byte(token: &str) -> Result<u8, ParseError> {
    u8::from_str_radix(token, 16).map_err(|_| ParseError::Malformed {
        reason: format!("not a hex byte: {token}"),
    })
}

/// Decodes over raw byte pairs, so non-ASCII tokens are rejected
/// instead of tripping a char-boundary slice.
pub fn parse_hex_bytes(token: &str) -> Result<Vec<u8>, ParseError> {
    let digits = token.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(ParseError::Malformed {
            reason: format!("odd-length payload: {token}"),
        });
    }
    digits
        .chunks_exact(2)
        .map(|pair| Ok(hex_digit(pair[0])? << 4 | hex_digit(pair[1])?))
        .collect()
}

fn hex_digit(byte: u8) -> Result<u8, ParseError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(ParseError::Malformed {
            reason: format!("not a hex digit: {byte:#04X}"),
        }),
    }
}

pub fn parse_decimal(token: &str) -> Result<usize, ParseError> {
    token.parse::<usize>().map_err(|_| ParseError::Malformed {
        reason: format!("not a decimal length: {token}"),
    })
}

/// Uppercase hex rendering used by the canonical frame form.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
