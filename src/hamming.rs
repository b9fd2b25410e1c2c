use std::fmt;

use crate::error::{BkError, Result};
use crate::tree::Metric;
use crate::util::{first_non_hex, parse_chunk, parse_words, CHUNK_DIGITS};

/// Population count without branches or lookup tables: sum adjacent bits,
/// then nibbles, then fold the four byte counts together with a multiply.
#[inline(always)]
pub fn bit_count(n: u32) -> u32 {
    let n = n - ((n >> 1) & 0x5555_5555);
    let n = (n & 0x3333_3333) + ((n >> 2) & 0x3333_3333);
    (((n + (n >> 4)) & 0x0f0f_0f0f).wrapping_mul(0x0101_0101)) >> 24
}

/// Hamming distance between two hex strings of equal length, compared in
/// 32-bit (eight digit) chunks.
pub fn hex_distance(a: &str, b: &str) -> Result<u32> {
    if a.len() != b.len() || a.len() % CHUNK_DIGITS != 0 {
        return Err(BkError::KeyLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a == b {
        return Ok(0);
    }

    let parse = |key: &str, offset: usize, chunk: &[u8]| {
        parse_chunk(chunk).map_err(|i| BkError::InvalidHexDigit {
            key: key.to_owned(),
            position: offset + i,
        })
    };

    a.as_bytes()
        .chunks(CHUNK_DIGITS)
        .zip(b.as_bytes().chunks(CHUNK_DIGITS))
        .enumerate()
        .try_fold(0, |dist, (n, (ca, cb))| {
            let offset = n * CHUNK_DIGITS;
            let va = parse(a, offset, ca)?;
            let vb = parse(b, offset, cb)?;
            Ok(dist + bit_count(va ^ vb))
        })
}

/// Width of the keys held by a Hamming tree. Always a positive multiple of 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBits(usize);

impl KeyBits {
    /// Widest supported key, 16384 hex digits.
    pub const MAX: usize = 1 << 16;

    pub fn new(bits: usize) -> Result<Self> {
        if bits == 0 || bits % 64 != 0 {
            return Err(BkError::InvalidKeyBits(bits));
        }
        if bits > Self::MAX {
            return Err(BkError::KeyBitsTooLarge {
                bits,
                max: Self::MAX,
            });
        }
        Ok(KeyBits(bits))
    }

    pub fn bits(self) -> usize {
        self.0
    }

    /// Length of a canonical key in hex digits.
    pub fn hex_len(self) -> usize {
        self.0 / 4
    }

    /// Number of 32-bit chunks in a key.
    pub fn chunks(self) -> usize {
        self.0 / 32
    }
}

impl TryFrom<usize> for KeyBits {
    type Error = BkError;

    fn try_from(bits: usize) -> Result<Self> {
        KeyBits::new(bits)
    }
}

/// Left-pads `key` with zeros to the canonical width for `bits`. Keys that
/// are already canonical come back unchanged; longer keys are rejected.
pub fn pad_key(key: &str, bits: KeyBits) -> Result<String> {
    if let Some(position) = first_non_hex(key.as_bytes()) {
        return Err(BkError::InvalidHexDigit {
            key: key.to_owned(),
            position,
        });
    }
    let width = bits.hex_len();
    if key.len() > width {
        return Err(BkError::KeyTooLong {
            len: key.len(),
            max: width,
        });
    }
    Ok(format!("{key:0>width$}"))
}

/// A canonical (zero padded) key along with its parsed 32-bit chunks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HammingKey {
    hex: Box<str>,
    words: Box<[u32]>,
}

impl HammingKey {
    /// Pads and parses `key` for a tree of width `bits`.
    pub fn new(key: &str, bits: KeyBits) -> Result<Self> {
        let hex = pad_key(key, bits)?;
        let words = parse_words(hex.as_bytes()).map_err(|position| BkError::InvalidHexDigit {
            key: hex.clone(),
            position,
        })?;
        Ok(HammingKey {
            hex: hex.into_boxed_str(),
            words: words.into_boxed_slice(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

impl AsRef<str> for HammingKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for HammingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Hamming distance over pre-parsed keys of the same width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hamming;

impl Metric<HammingKey> for Hamming {
    fn distance(&self, a: &HammingKey, b: &HammingKey) -> u32 {
        debug_assert_eq!(a.words.len(), b.words.len());
        if a.words == b.words {
            return 0;
        }
        a.words
            .iter()
            .zip(b.words.iter())
            .map(|(x, y)| bit_count(x ^ y))
            .sum()
    }
}
