//! Pulse BLE
//!
//! `btleplug` backend for pulse sessions.
//!
//! # Example
//!
//! ```ignore
//! use pulse_ble::{ble, Driver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = ble::get_adapter(0).await?;
//!
//!     // List nearby devices
//!     for device in ble::scan(&adapter, std::time::Duration::from_secs(5)).await? {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     // Or drive a full session
//!     let (transport, requests) = pulse_session::ChannelTransport::channel();
//!     let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
//!     let (notice_tx, mut notice_rx) = tokio::sync::mpsc::channel(64);
//!     tokio::spawn(Driver::new(adapter, event_tx).run(requests));
//!     tokio::spawn(pulse_session::run(pulse_session::Machine::new(), transport, event_rx, notice_tx));
//!     while let Some(notice) = notice_rx.recv().await {
//!         println!("{notice}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod ble;
mod driver;
mod table;

pub use ble::{BleError, DiscoveredDevice};
pub use driver::Driver;
