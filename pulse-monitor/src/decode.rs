//! Offline decoding of captured characteristic values

use pulse_proto::{CharacteristicKind, DecodeError, Value};

#[derive(Debug, thiserror::Error)]
pub enum DecodeCommandError {
    #[error("invalid characteristic UUID {0:?}, expected 16-bit hex like 2A37")]
    InvalidUuid(String),
    #[error("characteristic 0x{0:04X} has no decoder")]
    Unknown(u16),
    #[error("invalid hex payload: {0}")]
    Hex(#[from] data_encoding::DecodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub fn parse_characteristic(s: &str) -> Result<CharacteristicKind, DecodeCommandError> {
    let digits = s.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    let short = u16::from_str_radix(digits, 16)
        .map_err(|_| DecodeCommandError::InvalidUuid(s.to_string()))?;
    CharacteristicKind::from_short(short).ok_or(DecodeCommandError::Unknown(short))
}

/// Decode `payload` (hex, whitespace allowed) as a value of `characteristic`
pub fn decode(
    characteristic: &str,
    payload: &str,
) -> Result<(CharacteristicKind, Value), DecodeCommandError> {
    let kind = parse_characteristic(characteristic)?;
    let hex: String = payload.split_whitespace().collect();
    let bytes = data_encoding::HEXLOWER_PERMISSIVE.decode(hex.as_bytes())?;
    Ok((kind, kind.decode(&bytes)?))
}
