use pyo3::exceptions::PyValueError;
use pyo3::PyErr;

/// Errors raised by tree construction, key handling and distance computation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BkError {
    /// A distance was needed but the tree was built without a metric.
    #[error("no distance function")]
    MissingDistance,

    #[error("key size must be a multiple of 64, got {0}")]
    InvalidKeyBits(usize),

    #[error("key size {bits} exceeds the maximum of {max}")]
    KeyBitsTooLarge { bits: usize, max: usize },

    #[error("key has {len} hex digits, at most {max} allowed")]
    KeyTooLong { len: usize, max: usize },

    #[error("can't parse hash {key:?}: invalid hex digit at {position}")]
    InvalidHexDigit { key: String, position: usize },

    /// Raw comparison of keys that are not the same whole number of 32-bit chunks.
    #[error("key length mismatch: {left} != {right}")]
    KeyLengthMismatch { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, BkError>;

impl From<BkError> for PyErr {
    fn from(err: BkError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}
