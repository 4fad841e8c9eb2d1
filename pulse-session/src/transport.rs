//! The boundary with the BLE radio
//!
//! Requests flow out, events flow back in. Handles are opaque numbers minted by the
//! transport; the session never looks inside them.

use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeripheralHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u32);

/// Why the radio side gave up
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport channel closed")]
    Closed,
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("cancelled")]
    Cancelled,
}

/// Something the session asks the radio to do
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Scan for peripherals advertising any of these services
    Scan { services: Vec<Uuid> },
    StopScan,
    Connect(PeripheralHandle),
    /// Discover every service, unfiltered
    DiscoverServices(PeripheralHandle),
    DiscoverCharacteristics(ServiceHandle),
    Read(CharacteristicHandle),
    SetNotify(CharacteristicHandle, bool),
    /// Tear the link down (or stop scanning) and report `Disconnected`
    Disconnect,
}

/// Something the radio reports back
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PeripheralFound {
        peripheral: PeripheralHandle,
        local_name: Option<String>,
    },
    Connected(PeripheralHandle),
    ServicesDiscovered(Vec<(ServiceHandle, Uuid)>),
    CharacteristicsDiscovered {
        service: ServiceHandle,
        characteristics: Vec<(CharacteristicHandle, Uuid)>,
    },
    /// A notification or the completion of a read
    ValueUpdated {
        characteristic: CharacteristicHandle,
        value: Vec<u8>,
    },
    Disconnected { reason: TransportError },
}

/// A radio that accepts requests without blocking.
///
/// Implementations only have to provide [`Transport::submit`]; results come back
/// later as [`Event`]s.
pub trait Transport {
    fn submit(&mut self, request: Request) -> Result<(), TransportError>;

    fn scan(&mut self, services: &[Uuid]) -> Result<(), TransportError> {
        self.submit(Request::Scan {
            services: services.to_vec(),
        })
    }

    fn stop_scan(&mut self) -> Result<(), TransportError> {
        self.submit(Request::StopScan)
    }

    fn connect(&mut self, peripheral: PeripheralHandle) -> Result<(), TransportError> {
        self.submit(Request::Connect(peripheral))
    }

    fn discover_services(&mut self, peripheral: PeripheralHandle) -> Result<(), TransportError> {
        self.submit(Request::DiscoverServices(peripheral))
    }

    fn discover_characteristics(&mut self, service: ServiceHandle) -> Result<(), TransportError> {
        self.submit(Request::DiscoverCharacteristics(service))
    }

    fn read_value(&mut self, characteristic: CharacteristicHandle) -> Result<(), TransportError> {
        self.submit(Request::Read(characteristic))
    }

    fn set_notify(
        &mut self,
        characteristic: CharacteristicHandle,
        enabled: bool,
    ) -> Result<(), TransportError> {
        self.submit(Request::SetNotify(characteristic, enabled))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.submit(Request::Disconnect)
    }
}

/// Transport that queues requests for a driver task on the other end of a channel
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Request>,
}

impl ChannelTransport {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Request>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn submit(&mut self, request: Request) -> Result<(), TransportError> {
        self.tx.send(request).map_err(|_| TransportError::Closed)
    }
}
