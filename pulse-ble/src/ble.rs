//! Adapter lookup and a one-shot scan for nearby heart rate sensors

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use std::time::Duration;
use uuid::Uuid;

use pulse_proto::ServiceKind;

#[derive(Debug, thiserror::Error)]
pub enum BleError {
    #[error("bluetooth error: {0}")]
    Btleplug(#[from] btleplug::Error),
    #[error("no bluetooth adapter at index {0}")]
    NoAdapter(usize),
}

/// A device seen while scanning
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    /// Advertises the Heart Rate service
    pub is_heart_rate: bool,
}

/// Get the Bluetooth adapter at `index` (0 is the system default)
pub async fn get_adapter(index: usize) -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().nth(index).ok_or(BleError::NoAdapter(index))
}

/// Scan for BLE devices
///
/// Returns every device seen in `duration`, heart rate sensors first.
pub async fn scan(adapter: &Adapter, duration: Duration) -> Result<Vec<DiscoveredDevice>, BleError> {
    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(duration).await;

    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let address = peripheral.address().to_string();
            let rssi = props.rssi;
            let is_heart_rate = advertises_heart_rate(&props.services);

            devices.push(DiscoveredDevice { name, address, rssi, is_heart_rate });
        }
    }

    adapter.stop_scan().await?;
    devices.sort_by_key(|d| (!d.is_heart_rate, std::cmp::Reverse(d.rssi)));
    Ok(devices)
}

fn advertises_heart_rate(services: &[Uuid]) -> bool {
    services.contains(&ServiceKind::HeartRate.uuid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_proto::uuid_from_u16;

    #[test]
    fn heart_rate_advertisement() {
        assert!(advertises_heart_rate(&[uuid_from_u16(0x180F), uuid_from_u16(0x180D)]));
        assert!(!advertises_heart_rate(&[uuid_from_u16(0x180A)]));
        assert!(!advertises_heart_rate(&[]));
    }
}
