//! GATT registry for the services and characteristics a heart-rate sensor exposes
//!
//! UUIDs are the 16-bit short forms assigned by the Bluetooth SIG. Transports hand us
//! full 128-bit UUIDs, so classification first folds them back onto the Bluetooth base
//! UUID. Anything we do not know classifies as `None`; real devices expose plenty of
//! other services and that is not an error.

use uuid::Uuid;

use crate::{BodySensorLocation, DecodeError, HeartRateRecord, Value};
use crate::values::{decode_battery_level, decode_manufacturer_name};

/// Bluetooth base UUID: 00000000-0000-1000-8000-00805f9b34fb
pub const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

const BASE_MASK: u128 = (1u128 << 96) - 1;

// Services
pub const HEART_RATE_SERVICE: u16 = 0x180D;
pub const DEVICE_INFORMATION_SERVICE: u16 = 0x180A;
pub const BATTERY_SERVICE: u16 = 0x180F;

// Characteristics
pub const HEART_RATE_MEASUREMENT: u16 = 0x2A37;
pub const BODY_SENSOR_LOCATION: u16 = 0x2A38;
pub const MANUFACTURER_NAME_STRING: u16 = 0x2A29;
pub const BATTERY_LEVEL: u16 = 0x2A19;

/// Expand a 16-bit SIG UUID to its 128-bit form.
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Recover the 16-bit form of a UUID built on the Bluetooth base UUID.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    if value & BASE_MASK != BLUETOOTH_BASE_UUID || value >> 112 != 0 {
        return None;
    }
    Some((value >> 96) as u16)
}

/// Services the monitor cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    DeviceInformation,
    HeartRate,
    Battery,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::DeviceInformation,
        ServiceKind::HeartRate,
        ServiceKind::Battery,
    ];

    pub const fn short(self) -> u16 {
        match self {
            ServiceKind::DeviceInformation => DEVICE_INFORMATION_SERVICE,
            ServiceKind::HeartRate => HEART_RATE_SERVICE,
            ServiceKind::Battery => BATTERY_SERVICE,
        }
    }

    pub const fn uuid(self) -> Uuid {
        uuid_from_u16(self.short())
    }

    pub fn from_short(short: u16) -> Option<Self> {
        match short {
            DEVICE_INFORMATION_SERVICE => Some(ServiceKind::DeviceInformation),
            HEART_RATE_SERVICE => Some(ServiceKind::HeartRate),
            BATTERY_SERVICE => Some(ServiceKind::Battery),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceKind::DeviceInformation => "Device Information",
            ServiceKind::HeartRate => "Heart Rate",
            ServiceKind::Battery => "Battery",
        };
        write!(f, "{name} (0x{:04X})", self.short())
    }
}

/// How a characteristic's value is obtained once it has been discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Read the value a single time
    ReadOnce,
    /// Enable notifications and receive every update
    Subscribe,
}

/// Characteristics the monitor knows how to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicKind {
    ManufacturerNameString,
    HeartRateMeasurement,
    BodySensorLocation,
    BatteryLevel,
}

impl CharacteristicKind {
    pub const ALL: [CharacteristicKind; 4] = [
        CharacteristicKind::ManufacturerNameString,
        CharacteristicKind::HeartRateMeasurement,
        CharacteristicKind::BodySensorLocation,
        CharacteristicKind::BatteryLevel,
    ];

    pub const fn short(self) -> u16 {
        match self {
            CharacteristicKind::ManufacturerNameString => MANUFACTURER_NAME_STRING,
            CharacteristicKind::HeartRateMeasurement => HEART_RATE_MEASUREMENT,
            CharacteristicKind::BodySensorLocation => BODY_SENSOR_LOCATION,
            CharacteristicKind::BatteryLevel => BATTERY_LEVEL,
        }
    }

    pub const fn uuid(self) -> Uuid {
        uuid_from_u16(self.short())
    }

    pub fn from_short(short: u16) -> Option<Self> {
        match short {
            MANUFACTURER_NAME_STRING => Some(CharacteristicKind::ManufacturerNameString),
            HEART_RATE_MEASUREMENT => Some(CharacteristicKind::HeartRateMeasurement),
            BODY_SENSOR_LOCATION => Some(CharacteristicKind::BodySensorLocation),
            BATTERY_LEVEL => Some(CharacteristicKind::BatteryLevel),
            _ => None,
        }
    }

    /// Only the measurement stream is subscribed; everything else is static and read once.
    pub const fn request_mode(self) -> RequestMode {
        match self {
            CharacteristicKind::HeartRateMeasurement => RequestMode::Subscribe,
            _ => RequestMode::ReadOnce,
        }
    }

    /// The service this characteristic is defined under
    pub const fn service(self) -> ServiceKind {
        match self {
            CharacteristicKind::ManufacturerNameString => ServiceKind::DeviceInformation,
            CharacteristicKind::HeartRateMeasurement | CharacteristicKind::BodySensorLocation => {
                ServiceKind::HeartRate
            }
            CharacteristicKind::BatteryLevel => ServiceKind::Battery,
        }
    }

    /// Run the decoder registered for this characteristic.
    pub fn decode(self, data: &[u8]) -> Result<Value, DecodeError> {
        Ok(match self {
            CharacteristicKind::ManufacturerNameString => {
                Value::ManufacturerName(decode_manufacturer_name(data)?)
            }
            CharacteristicKind::HeartRateMeasurement => {
                Value::HeartRate(HeartRateRecord::from_bytes(data)?)
            }
            CharacteristicKind::BodySensorLocation => {
                Value::BodySensorLocation(BodySensorLocation::from_bytes(data)?)
            }
            CharacteristicKind::BatteryLevel => Value::BatteryLevel(decode_battery_level(data)?),
        })
    }
}

impl std::fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CharacteristicKind::ManufacturerNameString => "Manufacturer Name String",
            CharacteristicKind::HeartRateMeasurement => "Heart Rate Measurement",
            CharacteristicKind::BodySensorLocation => "Body Sensor Location",
            CharacteristicKind::BatteryLevel => "Battery Level",
        };
        write!(f, "{name} (0x{:04X})", self.short())
    }
}

/// Classify a discovered service UUID; unknown services yield `None`.
pub fn classify_service(uuid: &Uuid) -> Option<ServiceKind> {
    short_uuid(uuid).and_then(ServiceKind::from_short)
}

/// Classify a discovered characteristic UUID; unknown characteristics yield `None`.
pub fn classify_characteristic(uuid: &Uuid) -> Option<CharacteristicKind> {
    short_uuid(uuid).and_then(CharacteristicKind::from_short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_uuid_expansion() {
        assert_eq!(
            uuid_from_u16(0x180D).to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(short_uuid(&uuid_from_u16(0x2A37)), Some(0x2A37));
    }

    #[test]
    fn vendor_uuids_have_no_short_form() {
        let vendor = Uuid::from_u128(0xb40e1000_5e7c_1c3e_0000_000000000000);
        assert_eq!(short_uuid(&vendor), None);
        assert_eq!(classify_service(&vendor), None);

        // 32-bit SIG aliases are not 16-bit ones
        let wide = Uuid::from_u128(BLUETOOTH_BASE_UUID | (0x0001_180Du128 << 96));
        assert_eq!(short_uuid(&wide), None);
    }

    #[test]
    fn known_services() {
        for kind in ServiceKind::ALL {
            assert_eq!(classify_service(&kind.uuid()), Some(kind));
        }
        assert_eq!(
            classify_service(&uuid_from_u16(0x180D)),
            Some(ServiceKind::HeartRate)
        );
        assert_eq!(classify_service(&uuid_from_u16(0x1800)), None);
    }

    #[test]
    fn known_characteristics() {
        for kind in CharacteristicKind::ALL {
            assert_eq!(classify_characteristic(&kind.uuid()), Some(kind));
        }
        assert_eq!(
            CharacteristicKind::HeartRateMeasurement.request_mode(),
            RequestMode::Subscribe
        );
        assert_eq!(
            CharacteristicKind::BatteryLevel.request_mode(),
            RequestMode::ReadOnce
        );
        assert_eq!(
            CharacteristicKind::BodySensorLocation.service(),
            ServiceKind::HeartRate
        );
    }

    #[test]
    fn random_unknown_characteristics() {
        let known: Vec<u16> = CharacteristicKind::ALL.iter().map(|k| k.short()).collect();
        let mut tested = 0;
        while tested < 2000 {
            let short: u16 = rand::random();
            if known.contains(&short) {
                continue;
            }
            assert_eq!(classify_characteristic(&uuid_from_u16(short)), None, "{short:#06x}");
            tested += 1;
        }
    }

    #[test]
    fn decode_dispatches_by_kind() {
        assert_eq!(
            CharacteristicKind::BatteryLevel.decode(&[87]),
            Ok(Value::BatteryLevel(87))
        );
        assert_eq!(
            CharacteristicKind::BodySensorLocation.decode(&[0x01]),
            Ok(Value::BodySensorLocation(BodySensorLocation::Chest))
        );
        assert!(matches!(
            CharacteristicKind::HeartRateMeasurement.decode(&[0x00, 0x46]),
            Ok(Value::HeartRate(r)) if r.beats_per_minute == 70
        ));
    }
}
