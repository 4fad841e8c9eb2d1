//! Single-value characteristics and the typed value any known characteristic decodes to

use crate::{DecodeError, HeartRateRecord};

/// Body Sensor Location (0x2A38), one byte holding the ordinal below
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySensorLocation {
    Other,
    Chest,
    Wrist,
    Finger,
    Hand,
    EarLobe,
    Foot,
}

impl BodySensorLocation {
    pub fn from_byte(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => BodySensorLocation::Other,
            1 => BodySensorLocation::Chest,
            2 => BodySensorLocation::Wrist,
            3 => BodySensorLocation::Finger,
            4 => BodySensorLocation::Hand,
            5 => BodySensorLocation::EarLobe,
            6 => BodySensorLocation::Foot,
            _ => {
                return Err(DecodeError::OutOfRange {
                    field: "body sensor location",
                    value,
                });
            }
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        Self::from_byte(single_byte("body sensor location", data)?)
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for BodySensorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BodySensorLocation::Other => "Other",
            BodySensorLocation::Chest => "Chest",
            BodySensorLocation::Wrist => "Wrist",
            BodySensorLocation::Finger => "Finger",
            BodySensorLocation::Hand => "Hand",
            BodySensorLocation::EarLobe => "Ear Lobe",
            BodySensorLocation::Foot => "Foot",
        })
    }
}

/// Manufacturer Name String (0x2A29). Invalid UTF-8 is rejected, never replaced.
pub fn decode_manufacturer_name(data: &[u8]) -> Result<String, DecodeError> {
    Ok(std::str::from_utf8(data)?.to_string())
}

/// Battery Level (0x2A19), a percentage
pub fn decode_battery_level(data: &[u8]) -> Result<u8, DecodeError> {
    let level = single_byte("battery level", data)?;
    if level > 100 {
        return Err(DecodeError::OutOfRange {
            field: "battery level",
            value: level,
        });
    }
    Ok(level)
}

fn single_byte(field: &'static str, data: &[u8]) -> Result<u8, DecodeError> {
    match data {
        [value] => Ok(*value),
        [] => Err(DecodeError::Truncated {
            field,
            needed: 1,
            remaining: 0,
        }),
        _ => Err(DecodeError::UnexpectedLength {
            field,
            expected: 1,
            actual: data.len(),
        }),
    }
}

/// A decoded characteristic value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    HeartRate(HeartRateRecord),
    BodySensorLocation(BodySensorLocation),
    ManufacturerName(String),
    BatteryLevel(u8),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::HeartRate(record) => {
                write!(f, "{} bpm, contact {:?}", record.beats_per_minute, record.contact_status)?;
                if let Some(energy) = record.energy_expended_kj {
                    write!(f, ", {energy} kJ")?;
                }
                if !record.rr_intervals.is_empty() {
                    write!(f, ", rr {:?} s", record.rr_intervals)?;
                }
                Ok(())
            }
            Value::BodySensorLocation(location) => write!(f, "sensor on {location}"),
            Value::ManufacturerName(name) => write!(f, "manufacturer {name:?}"),
            Value::BatteryLevel(level) => write!(f, "battery {level}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_sensor_location() {
        assert_eq!(
            BodySensorLocation::from_bytes(&[0x02]),
            Ok(BodySensorLocation::Wrist)
        );
        assert_eq!(
            BodySensorLocation::from_bytes(&[0x06]),
            Ok(BodySensorLocation::Foot)
        );
        assert_eq!(
            BodySensorLocation::from_bytes(&[0xFF]),
            Err(DecodeError::OutOfRange {
                field: "body sensor location",
                value: 0xFF
            })
        );
        assert!(matches!(
            BodySensorLocation::from_bytes(&[0x07]),
            Err(DecodeError::OutOfRange { value: 7, .. })
        ));
    }

    #[test]
    fn body_sensor_location_ordinals() {
        for value in 0..=6u8 {
            assert_eq!(BodySensorLocation::from_byte(value).unwrap().to_byte(), value);
        }
    }

    #[test]
    fn body_sensor_location_length() {
        assert!(BodySensorLocation::from_bytes(&[]).unwrap_err().is_truncated());
        assert_eq!(
            BodySensorLocation::from_bytes(&[0x01, 0x00]),
            Err(DecodeError::UnexpectedLength {
                field: "body sensor location",
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn manufacturer_name() {
        assert_eq!(
            decode_manufacturer_name(b"Polar Electro Oy").unwrap(),
            "Polar Electro Oy"
        );
        assert_eq!(decode_manufacturer_name(b"").unwrap(), "");
        assert!(matches!(
            decode_manufacturer_name(&[0x50, 0xFF, 0xFE]),
            Err(DecodeError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn battery_level() {
        assert_eq!(decode_battery_level(&[0]), Ok(0));
        assert_eq!(decode_battery_level(&[100]), Ok(100));
        assert!(matches!(
            decode_battery_level(&[101]),
            Err(DecodeError::OutOfRange { value: 101, .. })
        ));
        assert!(decode_battery_level(&[]).unwrap_err().is_truncated());
    }
}
