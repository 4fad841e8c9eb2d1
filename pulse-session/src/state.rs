//! Latest known values for the connected peripheral

use pulse_proto::{BodySensorLocation, CharacteristicKind, HeartRateRecord, Value};

use crate::{PeripheralHandle, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected(TransportError),
}

/// Session state - one per connection, written only by the state machine
#[derive(Debug, Clone)]
pub struct SessionState {
    pub peripheral: PeripheralHandle,
    pub name: String,
    pub status: ConnectionStatus,
    /// Most recent measurement, replaced wholesale by every notification
    pub heart_rate: Option<HeartRateRecord>,
    pub body_sensor_location: Option<BodySensorLocation>,
    pub manufacturer_name: Option<String>,
    pub battery_level: Option<u8>,
}

impl SessionState {
    pub fn new(peripheral: PeripheralHandle, name: String) -> Self {
        Self {
            peripheral,
            name,
            status: ConnectionStatus::Connected,
            heart_rate: None,
            body_sensor_location: None,
            manufacturer_name: None,
            battery_level: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Store a freshly decoded value; other fields are left alone.
    pub fn apply(&mut self, value: Value) {
        match value {
            Value::HeartRate(record) => self.heart_rate = Some(record),
            Value::BodySensorLocation(location) => self.body_sensor_location = Some(location),
            Value::ManufacturerName(name) => self.manufacturer_name = Some(name),
            Value::BatteryLevel(level) => self.battery_level = Some(level),
        }
    }

    pub fn heart_rate_bpm(&self) -> u16 {
        self.heart_rate.as_ref().map_or(0, |r| r.beats_per_minute)
    }

    pub fn sensor_detected(&self) -> bool {
        self.heart_rate.as_ref().is_some_and(|r| r.sensor_detected())
    }

    /// Snapshot for collaborators after `source` was updated
    pub fn change(&self, source: CharacteristicKind) -> Change {
        let record = self.heart_rate.as_ref();
        Change {
            source,
            heart_rate: self.heart_rate_bpm(),
            sensor_detected: self.sensor_detected(),
            manufacturer_name: self.manufacturer_name.clone(),
            body_sensor_location: self.body_sensor_location,
            battery_level: self.battery_level,
            energy_expended_kj: record.and_then(|r| r.energy_expended_kj),
            rr_intervals: record.map(|r| r.rr_intervals.clone()).unwrap_or_default(),
        }
    }
}

/// Emitted after every successful decode-and-update
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Change {
    /// Characteristic whose update produced this change
    pub source: CharacteristicKind,
    pub heart_rate: u16,
    pub sensor_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_sensor_location: Option<BodySensorLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_expended_kj: Option<u16>,
    /// RR intervals carried by the latest measurement, in seconds
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rr_intervals: Vec<f64>,
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} bpm  sensor detected: {}",
            self.heart_rate,
            if self.sensor_detected { "yes" } else { "no" }
        )?;
        if let Some(name) = &self.manufacturer_name {
            write!(f, "  manufacturer: {name}")?;
        }
        if let Some(location) = self.body_sensor_location {
            write!(f, "  location: {location}")?;
        }
        if let Some(level) = self.battery_level {
            write!(f, "  battery: {level}%")?;
        }
        if let Some(energy) = self.energy_expended_kj {
            write!(f, "  energy: {energy} kJ")?;
        }
        if !self.rr_intervals.is_empty() {
            let rr = self
                .rr_intervals
                .iter()
                .map(|s| format!("{:.0} ms", s * 1000.0))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "  rr: [{rr}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_proto::ContactStatus;

    #[test]
    fn apply_keeps_unrelated_fields() {
        let mut state = SessionState::new(PeripheralHandle(0), "H7".to_string());
        state.apply(Value::ManufacturerName("Polar".to_string()));
        state.apply(Value::HeartRate(HeartRateRecord {
            beats_per_minute: 61,
            contact_status: ContactStatus::Detected,
            energy_expended_kj: None,
            rr_intervals: vec![0.5],
        }));
        state.apply(Value::BatteryLevel(40));

        let change = state.change(CharacteristicKind::BatteryLevel);
        assert_eq!(change.heart_rate, 61);
        assert!(change.sensor_detected);
        assert_eq!(change.manufacturer_name.as_deref(), Some("Polar"));
        assert_eq!(change.battery_level, Some(40));
        assert_eq!(change.rr_intervals, vec![0.5]);
    }

    #[test]
    fn newer_record_replaces_older() {
        let mut state = SessionState::new(PeripheralHandle(0), "H7".to_string());
        state.apply(Value::HeartRate(HeartRateRecord {
            beats_per_minute: 80,
            contact_status: ContactStatus::Detected,
            energy_expended_kj: Some(5),
            rr_intervals: vec![0.75],
        }));
        state.apply(Value::HeartRate(HeartRateRecord {
            beats_per_minute: 82,
            ..Default::default()
        }));

        let change = state.change(CharacteristicKind::HeartRateMeasurement);
        assert_eq!(change.heart_rate, 82);
        assert!(!change.sensor_detected);
        assert_eq!(change.energy_expended_kj, None);
        assert!(change.rr_intervals.is_empty());
    }

    #[test]
    fn change_json_omits_missing_fields() {
        let state = SessionState::new(PeripheralHandle(0), "H7".to_string());
        let change = state.change(CharacteristicKind::ManufacturerNameString);
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": "manufacturer_name_string",
                "heart_rate": 0,
                "sensor_detected": false,
            })
        );
    }
}
