//! Maps btleplug's GATT tree onto the numeric handles the session works with

use std::collections::{BTreeSet, HashMap};

use btleplug::api::{Characteristic, Service};
use pulse_session::{CharacteristicHandle, ServiceHandle};
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct GattTable {
    services: Vec<Uuid>,
    characteristics: Vec<Characteristic>,
    /// Characteristic indices per service index
    by_service: Vec<Vec<usize>>,
}

impl GattTable {
    pub(crate) fn new(services: BTreeSet<Service>) -> Self {
        let mut table = Self::default();
        for service in services {
            let mut members = Vec::with_capacity(service.characteristics.len());
            for characteristic in service.characteristics {
                members.push(table.characteristics.len());
                table.characteristics.push(characteristic);
            }
            table.services.push(service.uuid);
            table.by_service.push(members);
        }
        table
    }

    pub(crate) fn services(&self) -> Vec<(ServiceHandle, Uuid)> {
        self.services
            .iter()
            .enumerate()
            .map(|(i, uuid)| (ServiceHandle(i as u32), *uuid))
            .collect()
    }

    pub(crate) fn characteristics_of(
        &self,
        service: ServiceHandle,
    ) -> Option<Vec<(CharacteristicHandle, Uuid)>> {
        let members = self.by_service.get(service.0 as usize)?;
        Some(
            members
                .iter()
                .map(|&i| (CharacteristicHandle(i as u32), self.characteristics[i].uuid))
                .collect(),
        )
    }

    pub(crate) fn characteristic(&self, handle: CharacteristicHandle) -> Option<&Characteristic> {
        self.characteristics.get(handle.0 as usize)
    }

    /// Notifications only carry a UUID, so route each UUID to the first characteristic
    /// that has it.
    pub(crate) fn notification_routes(&self) -> HashMap<Uuid, CharacteristicHandle> {
        let mut routes = HashMap::new();
        for (i, characteristic) in self.characteristics.iter().enumerate() {
            routes
                .entry(characteristic.uuid)
                .or_insert(CharacteristicHandle(i as u32));
        }
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btleplug::api::CharPropFlags;
    use pulse_proto::uuid_from_u16;

    fn characteristic(service: u16, uuid: u16, properties: CharPropFlags) -> Characteristic {
        Characteristic {
            uuid: uuid_from_u16(uuid),
            service_uuid: uuid_from_u16(service),
            properties,
            descriptors: BTreeSet::new(),
        }
    }

    fn service(uuid: u16, characteristics: Vec<Characteristic>) -> Service {
        Service {
            uuid: uuid_from_u16(uuid),
            primary: true,
            characteristics: characteristics.into_iter().collect(),
        }
    }

    fn sample() -> GattTable {
        GattTable::new(BTreeSet::from([
            service(
                0x180D,
                vec![
                    characteristic(0x180D, 0x2A37, CharPropFlags::NOTIFY),
                    characteristic(0x180D, 0x2A38, CharPropFlags::READ),
                ],
            ),
            service(0x180F, vec![characteristic(0x180F, 0x2A19, CharPropFlags::READ)]),
            service(0x1801, vec![]),
        ]))
    }

    #[test]
    fn handles_cover_every_service() {
        let table = sample();
        let services = table.services();
        assert_eq!(services.len(), 3);
        for (handle, uuid) in services {
            let members = table.characteristics_of(handle).unwrap();
            for (ch, ch_uuid) in members {
                let c = table.characteristic(ch).unwrap();
                assert_eq!(c.uuid, ch_uuid);
                assert_eq!(c.service_uuid, uuid);
            }
        }
    }

    #[test]
    fn empty_service_has_empty_list() {
        let table = sample();
        let (gatt, _) = table
            .services()
            .into_iter()
            .find(|(_, uuid)| *uuid == uuid_from_u16(0x1801))
            .unwrap();
        assert_eq!(table.characteristics_of(gatt), Some(vec![]));
    }

    #[test]
    fn unknown_handles() {
        let table = sample();
        assert_eq!(table.characteristics_of(ServiceHandle(7)), None);
        assert!(table.characteristic(CharacteristicHandle(42)).is_none());
    }

    #[test]
    fn notifications_route_to_measurement() {
        let table = sample();
        let routes = table.notification_routes();
        let handle = routes[&uuid_from_u16(0x2A37)];
        assert_eq!(table.characteristic(handle).unwrap().uuid, uuid_from_u16(0x2A37));
        assert_eq!(routes.len(), 3);
    }
}
