/// Why a characteristic payload could not be turned into a typed value.
///
/// A decode error only concerns the single update that produced it.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{field}: payload truncated, needed {needed} byte(s) but {remaining} remain")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("{field}: value {value:#04x} is out of range")]
    OutOfRange { field: &'static str, value: u8 },
    #[error("text is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
    #[error("{field}: expected exactly {expected} byte(s), got {actual}")]
    UnexpectedLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl DecodeError {
    pub fn is_truncated(&self) -> bool {
        matches!(self, DecodeError::Truncated { .. })
    }
}
