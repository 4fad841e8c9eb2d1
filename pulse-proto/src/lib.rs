//! Pulse protocol - GATT registry and payload decoding
//!
//! Everything in this crate is synchronous and free of I/O:
//! - [`gatt`]: the well-known 16-bit UUIDs of the Heart Rate, Device Information and
//!   Battery services and their characteristics, and classification of raw UUIDs
//! - [`heart_rate`]: the flag-driven Heart Rate Measurement record
//! - [`values`]: the small single-value characteristics (body sensor location,
//!   manufacturer name, battery level) and the typed [`Value`] they decode into

pub mod error;
pub mod gatt;
pub mod heart_rate;
pub mod values;

pub use error::DecodeError;
pub use gatt::{
    CharacteristicKind, RequestMode, ServiceKind, classify_characteristic, classify_service,
    short_uuid, uuid_from_u16,
};
pub use heart_rate::{ContactStatus, HeartRateRecord};
pub use values::{BodySensorLocation, Value, decode_battery_level, decode_manufacturer_name};

/// Decode a Heart Rate Measurement (0x2A37) payload.
pub fn decode_heart_rate_record(data: &[u8]) -> Result<HeartRateRecord, DecodeError> {
    HeartRateRecord::from_bytes(data)
}

/// Decode a Body Sensor Location (0x2A38) payload.
pub fn decode_body_sensor_location(data: &[u8]) -> Result<BodySensorLocation, DecodeError> {
    BodySensorLocation::from_bytes(data)
}
