//! Sort-order-preserving base-32
//!
//! The alphabet is the RFC 4648 base-32 symbol set reordered so that symbol
//! order matches ASCII order: `234567abcdefghijklmnopqrstuvwxyz`. Encoded
//! strings of equal length therefore compare the same way as the values they
//! encode, which both PIDs (leading-zero compression) and TIDs (sortable
//! timestamps) depend on.

/// The 32-symbol alphabet, in ascending ASCII order
pub const ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";

/// The symbol for value zero
pub const ZERO: char = '2';

/// Bits carried by one symbol
pub const BITS_PER_SYMBOL: u32 = 5;

/// Symbol for a 5-bit value
pub fn symbol(value: u8) -> char {
    ALPHABET[(value & 0x1f) as usize] as char
}

/// Alphabet index of a symbol, `None` if it is not in the alphabet
pub fn index_of(c: char) -> Option<u8> {
    match c {
        '2'..='7' => Some(c as u8 - b'2'),
        'a'..='z' => Some(c as u8 - b'a' + 6),
        _ => None,
    }
}

/// Encode bytes MSB-first, five bits per symbol, without padding.
///
/// A trailing partial group is padded with zero bits on the right, so 32
/// bytes encode to 52 symbols.
pub fn encode_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u16 = 0;
    let mut bits: u32 = 0;

    for byte in data {
        buffer = (buffer << 8) | u16::from(*byte);
        bits += 8;
        while bits >= BITS_PER_SYMBOL {
            bits -= BITS_PER_SYMBOL;
            out.push(symbol(((buffer >> bits) & 0x1f) as u8));
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(symbol(((buffer << (BITS_PER_SYMBOL - bits)) & 0x1f) as u8));
    }
    out
}

/// Encode an integer as exactly `width` symbols, most significant first.
///
/// Bits above `width * 5` are dropped. Short values are padded with the
/// zero symbol, so the result sorts like the integer.
pub fn encode_u64(value: u64, width: usize) -> String {
    let mut out = vec![ZERO; width];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        *slot = symbol((rest & 0x1f) as u8);
        rest >>= BITS_PER_SYMBOL;
    }
    out.into_iter().collect()
}

/// Decode a fixed-width integer produced by [`encode_u64`]
pub fn decode_u64(encoded: &str) -> Option<u64> {
    if encoded.len() > 12 {
        return None;
    }
    encoded.chars().try_fold(0u64, |acc, c| {
        index_of(c).map(|i| (acc << BITS_PER_SYMBOL) | u64::from(i))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_is_ascii_sorted() {
        assert!(ALPHABET.windows(2).all(|w| w[0] < w[1]));
        for (i, c) in ALPHABET.iter().enumerate() {
            assert_eq!(index_of(*c as char), Some(i as u8));
        }
        assert_eq!(index_of('0'), None);
        assert_eq!(index_of('A'), None);
    }

    #[test]
    fn test_encode_bytes_lengths() {
        assert_eq!(encode_bytes(&[]), "");
        assert_eq!(encode_bytes(&[0]), "22");
        assert_eq!(encode_bytes(&[0xff]), "zw");
        assert_eq!(encode_bytes(&[0u8; 32]).len(), 52);
    }

    #[test]
    fn test_encode_u64_fixed_width() {
        assert_eq!(encode_u64(0, 4), "2222");
        assert_eq!(encode_u64(1, 4), "2223");
        assert_eq!(encode_u64(31, 2), "2z");
        assert_eq!(encode_u64(32, 2), "32");
        assert_eq!(decode_u64("32"), Some(32));
        assert_eq!(decode_u64("2!"), None);
    }
}
