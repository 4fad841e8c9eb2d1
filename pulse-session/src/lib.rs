//! Pulse Session - drives one heart-rate peripheral from scan to a live data stream
//!
//! The radio is somebody else's problem: a [`Transport`] accepts requests (scan,
//! connect, discover, read, subscribe) and reports back through [`Event`]s. The
//! [`Machine`] reacts to each event synchronously, issues the next requests, decodes
//! characteristic values and keeps the latest ones in a [`SessionState`].
//!
//! # Example
//!
//! ```ignore
//! let (transport, requests) = pulse_session::ChannelTransport::channel();
//! let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
//! let (notice_tx, mut notice_rx) = tokio::sync::mpsc::channel(64);
//!
//! // hand `requests` and `event_tx` to a radio driver, then:
//! tokio::spawn(pulse_session::run(pulse_session::Machine::new(), transport, event_rx, notice_tx));
//! while let Some(notice) = notice_rx.recv().await {
//!     println!("{notice}");
//! }
//! ```

mod machine;
mod runner;
mod state;
mod transport;

pub use machine::{Machine, Notice, Phase};
pub use runner::run;
pub use state::{Change, ConnectionStatus, SessionState};
pub use transport::{
    ChannelTransport, CharacteristicHandle, Event, PeripheralHandle, Request, ServiceHandle,
    Transport, TransportError,
};
