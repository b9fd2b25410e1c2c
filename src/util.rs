use lazy_static::lazy_static;

/// Marks a byte that is not a hex digit in [`HEX_TABLE`].
const NOT_HEX: u8 = 0xff;

/// Hex digits per 32-bit chunk.
pub const CHUNK_DIGITS: usize = 8;

lazy_static! {
    static ref HEX_TABLE: [u8; 256] = {
        let mut dest = [NOT_HEX; 256];
        (0u8..=255).for_each(|byte| {
            dest[byte as usize] = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => NOT_HEX,
            };
        });
        dest
    };
}

#[inline(always)]
pub fn hex_value(byte: u8) -> Option<u8> {
    match HEX_TABLE[byte as usize] {
        NOT_HEX => None,
        v => Some(v),
    }
}

/// Index of the first byte in `digits` that isn't a hex digit.
pub fn first_non_hex(digits: &[u8]) -> Option<usize> {
    digits.iter().position(|&b| hex_value(b).is_none())
}

/// Parses up to eight hex digits into a `u32`. Returns the offset of the
/// first bad digit on failure.
#[inline]
pub fn parse_chunk(chunk: &[u8]) -> Result<u32, usize> {
    debug_assert!(chunk.len() <= CHUNK_DIGITS);
    chunk.iter().enumerate().try_fold(0u32, |acc, (i, &b)| match hex_value(b) {
        Some(v) => Ok(acc << 4 | u32::from(v)),
        None => Err(i),
    })
}

/// Splits a run of hex digits into `u32` words, most significant first.
pub fn parse_words(digits: &[u8]) -> Result<Vec<u32>, usize> {
    digits
        .chunks(CHUNK_DIGITS)
        .enumerate()
        .map(|(n, chunk)| parse_chunk(chunk).map_err(|i| n * CHUNK_DIGITS + i))
        .collect()
}
