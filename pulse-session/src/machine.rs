//! Discovery/subscription state machine
//!
//! ```text
//! Idle -> Scanning -> Connecting -> ServicesDiscovering -> CharacteristicsDiscovering -> Ready
//!   \________\___________\________________\_______________________\______________\-> Disconnected
//! ```

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use pulse_proto::{
    CharacteristicKind, DecodeError, RequestMode, ServiceKind, classify_characteristic,
    classify_service,
};

use crate::{
    Change, CharacteristicHandle, ConnectionStatus, Event, PeripheralHandle, ServiceHandle,
    SessionState, Transport, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Connecting,
    ServicesDiscovering,
    /// Waiting for the characteristics of `remaining` services
    CharacteristicsDiscovering { remaining: usize },
    Ready,
    Disconnected,
}

/// What the machine tells collaborators after handling an event
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Connecting { name: String },
    Connected { name: String },
    /// Every discovered service has reported its characteristics
    Ready,
    Changed(Change),
    DecodeFailed {
        characteristic: CharacteristicKind,
        error: DecodeError,
    },
    Disconnected { reason: TransportError },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Connecting { name } => write!(f, "Connecting to {name}..."),
            Notice::Connected { name } => write!(f, "Connected to {name}"),
            Notice::Ready => write!(f, "All characteristics requested"),
            Notice::Changed(change) => write!(f, "{change}"),
            Notice::DecodeFailed {
                characteristic,
                error,
            } => write!(f, "Failed to decode {characteristic}: {error}"),
            Notice::Disconnected { reason } => write!(f, "Disconnected: {reason}"),
        }
    }
}

/// Drives a single peripheral session
#[derive(Debug)]
pub struct Machine {
    phase: Phase,
    /// Peripheral picked while scanning, with its advertised name
    target: Option<(PeripheralHandle, String)>,
    /// Services whose characteristics have not been reported yet
    pending_services: HashSet<ServiceHandle>,
    services: HashMap<ServiceHandle, Option<ServiceKind>>,
    characteristics: HashMap<CharacteristicHandle, CharacteristicKind>,
    session: Option<SessionState>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            target: None,
            pending_services: HashSet::new(),
            services: HashMap::new(),
            characteristics: HashMap::new(),
            session: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Disconnected
    }

    /// Present from the moment the peripheral connects
    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    /// Scan for peripherals advertising any of the known services.
    pub fn start_scan<T: Transport>(&mut self, transport: &mut T) -> Option<Notice> {
        if self.phase != Phase::Idle {
            warn!("start_scan ignored in phase {:?}", self.phase);
            return None;
        }

        let services: Vec<_> = ServiceKind::ALL.iter().map(|s| s.uuid()).collect();
        if let Err(e) = transport.scan(&services) {
            return self.fail(e);
        }
        info!("Scanning for heart rate sensors");
        self.phase = Phase::Scanning;
        None
    }

    /// Handle one transport event. Events that make no sense in the current phase are
    /// dropped.
    pub fn handle<T: Transport>(&mut self, event: Event, transport: &mut T) -> Option<Notice> {
        let result = match event {
            Event::Disconnected { reason } => return self.fail(reason),
            _ if self.phase == Phase::Disconnected => {
                debug!("event after disconnect ignored: {event:?}");
                return None;
            }
            Event::PeripheralFound {
                peripheral,
                local_name,
            } => self.on_peripheral_found(peripheral, local_name, transport),
            Event::Connected(peripheral) => self.on_connected(peripheral, transport),
            Event::ServicesDiscovered(services) => self.on_services(services, transport),
            Event::CharacteristicsDiscovered {
                service,
                characteristics,
            } => self.on_characteristics(service, characteristics, transport),
            Event::ValueUpdated {
                characteristic,
                value,
            } => Ok(self.on_value(characteristic, &value)),
        };

        match result {
            Ok(notice) => notice,
            Err(e) => self.fail(e),
        }
    }

    fn on_peripheral_found<T: Transport>(
        &mut self,
        peripheral: PeripheralHandle,
        local_name: Option<String>,
        transport: &mut T,
    ) -> Result<Option<Notice>, TransportError> {
        if self.phase != Phase::Scanning {
            return Ok(None);
        }
        let name = match local_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                debug!("ignoring unnamed peripheral {peripheral:?}");
                return Ok(None);
            }
        };

        info!("Found heart rate monitor: {name}");
        transport.stop_scan()?;
        transport.connect(peripheral)?;
        self.phase = Phase::Connecting;
        self.target = Some((peripheral, name.clone()));
        Ok(Some(Notice::Connecting { name }))
    }

    fn on_connected<T: Transport>(
        &mut self,
        peripheral: PeripheralHandle,
        transport: &mut T,
    ) -> Result<Option<Notice>, TransportError> {
        let name = match (&self.phase, &self.target) {
            (Phase::Connecting, Some((target, name))) if *target == peripheral => name.clone(),
            _ => {
                warn!("unexpected connection to {peripheral:?} in phase {:?}", self.phase);
                return Ok(None);
            }
        };

        transport.discover_services(peripheral)?;
        self.session = Some(SessionState::new(peripheral, name.clone()));
        self.phase = Phase::ServicesDiscovering;
        Ok(Some(Notice::Connected { name }))
    }

    fn on_services<T: Transport>(
        &mut self,
        services: Vec<(ServiceHandle, uuid::Uuid)>,
        transport: &mut T,
    ) -> Result<Option<Notice>, TransportError> {
        if self.phase != Phase::ServicesDiscovering {
            debug!("services reported in phase {:?}, ignored", self.phase);
            return Ok(None);
        }

        for (handle, uuid) in services {
            let kind = classify_service(&uuid);
            match kind {
                Some(kind) => info!("Discovered service: {kind}"),
                None => debug!("Discovered service: {uuid}"),
            }
            // unknown services are walked too; their characteristics just classify as unknown
            transport.discover_characteristics(handle)?;
            self.services.insert(handle, kind);
            self.pending_services.insert(handle);
        }

        Ok(self.advance_discovery())
    }

    fn on_characteristics<T: Transport>(
        &mut self,
        service: ServiceHandle,
        characteristics: Vec<(CharacteristicHandle, uuid::Uuid)>,
        transport: &mut T,
    ) -> Result<Option<Notice>, TransportError> {
        if !matches!(self.phase, Phase::CharacteristicsDiscovering { .. }) {
            debug!("characteristics reported in phase {:?}, ignored", self.phase);
            return Ok(None);
        }
        if !self.pending_services.remove(&service) {
            debug!("characteristics for {service:?} already handled or never requested");
            return Ok(None);
        }

        for (handle, uuid) in characteristics {
            let Some(kind) = classify_characteristic(&uuid) else {
                debug!("ignoring characteristic {uuid}");
                continue;
            };
            match kind.request_mode() {
                RequestMode::Subscribe => {
                    info!("Subscribing to {kind}");
                    transport.set_notify(handle, true)?;
                }
                RequestMode::ReadOnce => {
                    info!("Reading {kind}");
                    transport.read_value(handle)?;
                }
            }
            self.characteristics.insert(handle, kind);
        }

        Ok(self.advance_discovery())
    }

    fn advance_discovery(&mut self) -> Option<Notice> {
        if self.pending_services.is_empty() {
            info!(
                "Discovery complete: {} service(s), {} known characteristic(s)",
                self.services.len(),
                self.characteristics.len()
            );
            self.phase = Phase::Ready;
            Some(Notice::Ready)
        } else {
            self.phase = Phase::CharacteristicsDiscovering {
                remaining: self.pending_services.len(),
            };
            None
        }
    }

    fn on_value(&mut self, characteristic: CharacteristicHandle, value: &[u8]) -> Option<Notice> {
        // reads issued during discovery may complete before every service has reported
        if !matches!(
            self.phase,
            Phase::CharacteristicsDiscovering { .. } | Phase::Ready
        ) {
            debug!("value in phase {:?}, ignored", self.phase);
            return None;
        }
        let Some(&kind) = self.characteristics.get(&characteristic) else {
            debug!("value for untracked {characteristic:?}, ignored");
            return None;
        };
        let session = self.session.as_mut()?;

        debug!("{kind}: {}", data_encoding::HEXLOWER.encode(value));
        match kind.decode(value) {
            Ok(decoded) => {
                debug!("{kind}: {decoded}");
                session.apply(decoded);
                Some(Notice::Changed(session.change(kind)))
            }
            Err(error) => {
                warn!("failed to decode {kind}: {error}");
                Some(Notice::DecodeFailed {
                    characteristic: kind,
                    error,
                })
            }
        }
    }

    /// Abandon everything outstanding and move to `Disconnected`.
    fn fail(&mut self, reason: TransportError) -> Option<Notice> {
        if self.phase == Phase::Disconnected {
            return None;
        }
        warn!("Session ended in phase {:?}: {reason}", self.phase);
        self.phase = Phase::Disconnected;
        self.pending_services.clear();
        self.characteristics.clear();
        if let Some(session) = self.session.as_mut() {
            session.status = ConnectionStatus::Disconnected(reason.clone());
        }
        Some(Notice::Disconnected { reason })
    }
}
