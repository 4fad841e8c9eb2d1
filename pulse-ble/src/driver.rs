//! Radio driver: executes session requests with btleplug and reports what happens
//!
//! Requests are handled one at a time. Notifications are forwarded by a separate task
//! into the same event channel, so updates of one characteristic keep their order.

use std::collections::HashMap;

use btleplug::api::{Central, CentralEvent, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Peripheral, PeripheralId};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pulse_session::{Event, PeripheralHandle, Request, TransportError};

use crate::BleError;
use crate::table::GattTable;

pub struct Driver {
    adapter: Adapter,
    events: mpsc::Sender<Event>,
    peripherals: Vec<Peripheral>,
    ids: HashMap<PeripheralId, PeripheralHandle>,
    scanning: bool,
    connected: Option<PeripheralHandle>,
    table: GattTable,
    notifications: Option<JoinHandle<()>>,
}

impl Driver {
    pub fn new(adapter: Adapter, events: mpsc::Sender<Event>) -> Self {
        Self {
            adapter,
            events,
            peripherals: Vec::new(),
            ids: HashMap::new(),
            scanning: false,
            connected: None,
            table: GattTable::default(),
            notifications: None,
        }
    }

    /// Serve requests until every request sender is gone.
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
    ) -> Result<(), BleError> {
        let mut central_events = self.adapter.events().await?;

        loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else { break };
                    debug!("request: {request:?}");
                    if let Err(reason) = self.handle_request(request).await {
                        warn!("request failed: {reason}");
                        self.drop_link().await;
                        self.emit(Event::Disconnected { reason }).await;
                    }
                }
                Some(event) = central_events.next() => {
                    self.handle_central_event(event).await;
                }
            }
        }

        self.drop_link().await;
        Ok(())
    }

    async fn handle_request(&mut self, request: Request) -> Result<(), TransportError> {
        match request {
            Request::Scan { services } => {
                self.adapter
                    .start_scan(ScanFilter { services })
                    .await
                    .map_err(|e| TransportError::Request(format!("scan: {e}")))?;
                self.scanning = true;
            }
            Request::StopScan => self.stop_scan().await?,
            Request::Connect(handle) => {
                let peripheral = self.peripheral(handle)?;
                info!("Connecting to {}", peripheral.address());
                peripheral
                    .connect()
                    .await
                    .map_err(|e| TransportError::ConnectionLost(format!("connect: {e}")))?;
                self.connected = Some(handle);
                self.emit(Event::Connected(handle)).await;
            }
            Request::DiscoverServices(handle) => {
                let peripheral = self.peripheral(handle)?;
                peripheral
                    .discover_services()
                    .await
                    .map_err(|e| TransportError::DiscoveryFailed(e.to_string()))?;
                self.table = GattTable::new(peripheral.services());
                self.forward_notifications(&peripheral).await?;
                self.emit(Event::ServicesDiscovered(self.table.services())).await;
            }
            Request::DiscoverCharacteristics(service) => {
                let characteristics = self.table.characteristics_of(service).ok_or_else(|| {
                    TransportError::DiscoveryFailed(format!("unknown service {service:?}"))
                })?;
                self.emit(Event::CharacteristicsDiscovered {
                    service,
                    characteristics,
                })
                .await;
            }
            Request::Read(handle) => {
                let peripheral = self.connected_peripheral()?;
                let characteristic = self.table.characteristic(handle).ok_or_else(|| {
                    TransportError::Request(format!("unknown characteristic {handle:?}"))
                })?;
                let value = peripheral
                    .read(characteristic)
                    .await
                    .map_err(|e| TransportError::Request(format!("read {}: {e}", characteristic.uuid)))?;
                self.emit(Event::ValueUpdated {
                    characteristic: handle,
                    value,
                })
                .await;
            }
            Request::SetNotify(handle, enabled) => {
                let peripheral = self.connected_peripheral()?;
                let characteristic = self.table.characteristic(handle).ok_or_else(|| {
                    TransportError::Request(format!("unknown characteristic {handle:?}"))
                })?;
                let result = if enabled {
                    peripheral.subscribe(characteristic).await
                } else {
                    peripheral.unsubscribe(characteristic).await
                };
                result.map_err(|e| {
                    TransportError::Request(format!("notify {}: {e}", characteristic.uuid))
                })?;
            }
            Request::Disconnect => {
                self.drop_link().await;
                self.emit(Event::Disconnected {
                    reason: TransportError::Cancelled,
                })
                .await;
            }
        }
        Ok(())
    }

    async fn handle_central_event(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                if !self.scanning || self.connected.is_some() {
                    return;
                }
                let peripheral = match self.adapter.peripheral(&id).await {
                    Ok(peripheral) => peripheral,
                    Err(e) => {
                        debug!("peripheral {id:?} vanished: {e}");
                        return;
                    }
                };
                let local_name = match peripheral.properties().await {
                    Ok(props) => props.and_then(|p| p.local_name),
                    Err(e) => {
                        debug!("no properties for {id:?}: {e}");
                        None
                    }
                };
                let handle = self.register(id, peripheral);
                self.emit(Event::PeripheralFound {
                    peripheral: handle,
                    local_name,
                })
                .await;
            }
            CentralEvent::DeviceDisconnected(id) => {
                if self.connected.is_some() && self.ids.get(&id) == self.connected.as_ref() {
                    info!("Peripheral disconnected");
                    self.connected = None;
                    self.stop_notifications();
                    self.emit(Event::Disconnected {
                        reason: TransportError::ConnectionLost(
                            "peripheral disconnected".to_string(),
                        ),
                    })
                    .await;
                }
            }
            _ => {}
        }
    }

    fn register(&mut self, id: PeripheralId, peripheral: Peripheral) -> PeripheralHandle {
        if let Some(handle) = self.ids.get(&id) {
            return *handle;
        }
        let handle = PeripheralHandle(self.peripherals.len() as u32);
        self.peripherals.push(peripheral);
        self.ids.insert(id, handle);
        handle
    }

    fn peripheral(&self, handle: PeripheralHandle) -> Result<Peripheral, TransportError> {
        self.peripherals
            .get(handle.0 as usize)
            .cloned()
            .ok_or_else(|| TransportError::Request(format!("unknown peripheral {handle:?}")))
    }

    fn connected_peripheral(&self) -> Result<Peripheral, TransportError> {
        match self.connected {
            Some(handle) => self.peripheral(handle),
            None => Err(TransportError::ConnectionLost("not connected".to_string())),
        }
    }

    async fn forward_notifications(&mut self, peripheral: &Peripheral) -> Result<(), TransportError> {
        let mut stream = peripheral
            .notifications()
            .await
            .map_err(|e| TransportError::Request(format!("notifications: {e}")))?;
        let routes = self.table.notification_routes();
        let events = self.events.clone();

        self.stop_notifications();
        self.notifications = Some(tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                let Some(&characteristic) = routes.get(&notification.uuid) else {
                    debug!("notification from unknown characteristic {}", notification.uuid);
                    continue;
                };
                let event = Event::ValueUpdated {
                    characteristic,
                    value: notification.value,
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop_notifications(&mut self) {
        if let Some(task) = self.notifications.take() {
            task.abort();
        }
    }

    async fn stop_scan(&mut self) -> Result<(), TransportError> {
        if self.scanning {
            self.adapter
                .stop_scan()
                .await
                .map_err(|e| TransportError::Request(format!("stop scan: {e}")))?;
            self.scanning = false;
        }
        Ok(())
    }

    /// Best-effort teardown of the scan and the link.
    async fn drop_link(&mut self) {
        self.stop_notifications();
        if let Err(e) = self.stop_scan().await {
            debug!("{e}");
        }
        if let Some(handle) = self.connected.take() {
            if let Ok(peripheral) = self.peripheral(handle) {
                if let Err(e) = peripheral.disconnect().await {
                    debug!("disconnect: {e}");
                }
            }
        }
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }
}
