// Bit-array codec: parses integer literals into fixed-width little-endian
// byte buffers, and renders buffers back as hex strings.
//
// Decimal parsing is a width-unbounded accumulator over the output buffer
// itself (multiply-by-10-and-add, carry-propagated across every byte),
// not a host-integer parse — this is what lets a pattern be wider than
// any native integer type.

use crate::error::PatternError;

/// Parse `text` (hex `0x…`/`0X…`, octal `0…`, or decimal) into a
/// little-endian byte buffer of exactly `size_bytes` bytes.
///
/// Overflow beyond the buffer's width is truncated (high bits silently
/// dropped), matching the original's fixed-width accumulator.
pub fn parse_integer(text: &str, size_bytes: usize) -> Result<Vec<u8>, PatternError> {
    let bytes = text.as_bytes();
    let invalid = || PatternError::InvalidInteger {
        text: text.to_string(),
    };

    if let Some(rest) = bytes
        .strip_prefix(b"0x")
        .or_else(|| bytes.strip_prefix(b"0X"))
    {
        from_digits(rest, size_bytes, 4, hex_nibble, &invalid)
    } else if bytes.first() == Some(&b'0') && bytes.len() > 1 {
        from_digits(&bytes[1..], size_bytes, 3, oct_nibble, &invalid)
    } else if bytes.is_empty() {
        Err(invalid())
    } else {
        from_decimal(bytes, size_bytes, &invalid)
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(0xa + (c - b'a')),
        b'A'..=b'F' => Some(0xa + (c - b'A')),
        _ => None,
    }
}

fn oct_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'7' => Some(c - b'0'),
        _ => None,
    }
}

fn dec_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        _ => None,
    }
}

/// Shift `arr` left by `shift` bits (`shift < 8`) in place, most-significant
/// byte last (i.e. `arr` is little-endian).
fn lshift(arr: &mut [u8], shift: u32) {
    if shift == 0 {
        return;
    }
    debug_assert!(shift < 8);
    let rshift = 8 - shift;
    let mut prev = 0u8;
    for b in arr.iter_mut() {
        let cur = *b;
        *b = (cur << shift) | (prev >> rshift);
        prev = cur;
    }
}

/// Add a small value into `arr` (little-endian) with carry propagation.
fn add_u8(arr: &mut [u8], c: u8) {
    if arr.is_empty() {
        return;
    }
    let (sum, mut carry) = arr[0].overflowing_add(c);
    arr[0] = sum;
    let mut i = 0;
    while carry && i + 1 < arr.len() {
        i += 1;
        let (sum, c2) = arr[i].overflowing_add(1);
        arr[i] = sum;
        carry = c2;
    }
}

fn from_digits(
    digits: &[u8],
    size_bytes: usize,
    shift: u32,
    nibble: fn(u8) -> Option<u8>,
    invalid: &dyn Fn() -> PatternError,
) -> Result<Vec<u8>, PatternError> {
    if digits.is_empty() {
        return Err(invalid());
    }
    let mut arr = vec![0u8; size_bytes];
    for &c in digits {
        lshift(&mut arr, shift);
        let v = nibble(c).ok_or_else(invalid)?;
        add_u8(&mut arr, v);
    }
    Ok(arr)
}

/// Multiply the little-endian buffer in place by 10, per `bit_arr.c`'s
/// `mul_10`: computed as `(x << 1) + (x << 3)` with full carry propagation
/// across every byte, most-significant byte last.
fn mul_10(arr: &mut [u8]) {
    let n = arr.len();
    if n == 0 {
        return;
    }
    let mut shift1 = vec![0u8; n];
    let mut shift3 = vec![0u8; n];
    let mut prev1 = 0u8;
    let mut prev3 = 0u8;
    for i in 0..n {
        let cur = arr[i];
        shift1[i] = (cur << 1) | prev1;
        shift3[i] = (cur << 3) | prev3;
        prev1 = cur >> 7;
        prev3 = cur >> 5;
    }
    let mut carry = 0u16;
    for i in 0..n {
        let sum = shift1[i] as u16 + shift3[i] as u16 + carry;
        arr[i] = sum as u8;
        carry = sum >> 8;
    }
}

fn from_decimal(
    digits: &[u8],
    size_bytes: usize,
    invalid: &dyn Fn() -> PatternError,
) -> Result<Vec<u8>, PatternError> {
    let mut arr = vec![0u8; size_bytes];
    for &c in digits {
        mul_10(&mut arr);
        let v = dec_nibble(c).ok_or_else(invalid)?;
        add_u8(&mut arr, v);
    }
    Ok(arr)
}

/// Render a byte buffer as `"0x"` + big-endian (most significant byte
/// first) hex, for diagnostics.
pub fn render_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    for &b in bytes.iter().rev() {
        s.push_str(&format!("{b:02X}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let b = parse_integer("0x78563412", 4).unwrap();
        assert_eq!(b, vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(render_hex(&b), "0x78563412");
    }

    #[test]
    fn octal_parses() {
        let b = parse_integer("010", 2).unwrap();
        assert_eq!(b, vec![0x08, 0x00]);
    }

    #[test]
    fn decimal_parses() {
        let b = parse_integer("256", 2).unwrap();
        assert_eq!(b, vec![0x00, 0x01]);
    }

    #[test]
    fn decimal_truncates_at_width() {
        // 0x100 = 256, doesn't fit in 1 byte: truncates to 0x00.
        let b = parse_integer("256", 1).unwrap();
        assert_eq!(b, vec![0x00]);
    }

    #[test]
    fn invalid_digit_errs() {
        assert!(parse_integer("0xzz", 2).is_err());
        assert!(parse_integer("9a", 2).is_err());
        assert!(parse_integer("", 2).is_err());
    }

    #[test]
    fn wide_decimal_matches_hex() {
        // 16-byte (128-bit) literal exercised by the original's own test vectors.
        let hex = "0x12345678910111213141516171819202";
        let dec = "24197857200254328746765703854004736514";
        let from_hex = parse_integer(hex, 16).unwrap();
        let from_dec = parse_integer(dec, 16).unwrap();
        assert_eq!(from_hex, from_dec);
        assert_eq!(render_hex(&from_hex), hex);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_any_bytes(bytes: Vec<u8>) {
            let bytes = if bytes.is_empty() { vec![0u8] } else { bytes };
            let hex = render_hex(&bytes);
            let parsed = parse_integer(&hex, bytes.len()).unwrap();
            proptest::prop_assert_eq!(parsed, bytes);
        }
    }
}
