//! Sequential event loop around the state machine

use log::debug;
use tokio::sync::mpsc;

use crate::{Event, Machine, Notice, Transport, TransportError};

/// Start scanning, then process events one at a time until the session ends.
///
/// Every notice is forwarded in the order it was produced. Returns the machine so the
/// caller can inspect the final session state.
pub async fn run<T: Transport>(
    mut machine: Machine,
    mut transport: T,
    mut events: mpsc::Receiver<Event>,
    notices: mpsc::Sender<Notice>,
) -> Machine {
    if let Some(notice) = machine.start_scan(&mut transport) {
        forward(&notices, notice).await;
    }

    while !machine.is_finished() {
        let event = match events.recv().await {
            Some(event) => event,
            None => Event::Disconnected {
                reason: TransportError::Closed,
            },
        };
        if let Some(notice) = machine.handle(event, &mut transport) {
            forward(&notices, notice).await;
        }
    }

    machine
}

async fn forward(notices: &mpsc::Sender<Notice>, notice: Notice) {
    if notices.send(notice).await.is_err() {
        debug!("notice receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ChannelTransport, CharacteristicHandle, PeripheralHandle, Phase, Request, ServiceHandle,
    };
    use pulse_proto::uuid_from_u16;

    #[tokio::test]
    async fn full_session() {
        let (transport, mut requests) = ChannelTransport::channel();
        let (event_tx, event_rx) = mpsc::channel(16);
        let (notice_tx, mut notice_rx) = mpsc::channel(16);

        let session = tokio::spawn(run(Machine::new(), transport, event_rx, notice_tx));

        assert!(matches!(requests.recv().await, Some(Request::Scan { .. })));

        let peripheral = PeripheralHandle(0);
        let events = vec![
            Event::PeripheralFound {
                peripheral,
                local_name: Some("HRM-Pro".to_string()),
            },
            Event::Connected(peripheral),
            Event::ServicesDiscovered(vec![(ServiceHandle(0), uuid_from_u16(0x180D))]),
            Event::CharacteristicsDiscovered {
                service: ServiceHandle(0),
                characteristics: vec![(CharacteristicHandle(0), uuid_from_u16(0x2A37))],
            },
            Event::ValueUpdated {
                characteristic: CharacteristicHandle(0),
                value: vec![0x06, 0x41],
            },
            Event::ValueUpdated {
                characteristic: CharacteristicHandle(0),
                value: vec![0x04, 0x42],
            },
            Event::Disconnected {
                reason: TransportError::Cancelled,
            },
        ];
        for event in events {
            event_tx.send(event).await.unwrap();
        }

        let mut notices = Vec::new();
        while let Some(notice) = notice_rx.recv().await {
            notices.push(notice);
        }
        let machine = session.await.unwrap();

        assert_eq!(machine.phase(), Phase::Disconnected);
        assert_eq!(notices.len(), 6);
        assert_eq!(
            notices[0],
            Notice::Connecting {
                name: "HRM-Pro".to_string()
            }
        );
        assert_eq!(notices[2], Notice::Ready);
        match (&notices[3], &notices[4]) {
            (Notice::Changed(first), Notice::Changed(second)) => {
                assert_eq!((first.heart_rate, first.sensor_detected), (65, true));
                assert_eq!((second.heart_rate, second.sensor_detected), (66, false));
            }
            other => panic!("unexpected notices {other:?}"),
        }
        assert_eq!(
            notices[5],
            Notice::Disconnected {
                reason: TransportError::Cancelled
            }
        );

        let mut issued = Vec::new();
        while let Ok(request) = requests.try_recv() {
            issued.push(request);
        }
        assert_eq!(
            issued,
            vec![
                Request::StopScan,
                Request::Connect(peripheral),
                Request::DiscoverServices(peripheral),
                Request::DiscoverCharacteristics(ServiceHandle(0)),
                Request::SetNotify(CharacteristicHandle(0), true),
            ]
        );
    }

    #[tokio::test]
    async fn closed_event_channel_ends_session() {
        let (transport, _requests) = ChannelTransport::channel();
        let (event_tx, event_rx) = mpsc::channel(1);
        let (notice_tx, mut notice_rx) = mpsc::channel(4);
        drop(event_tx);

        let machine = run(Machine::new(), transport, event_rx, notice_tx).await;
        assert!(machine.is_finished());
        assert_eq!(
            notice_rx.recv().await,
            Some(Notice::Disconnected {
                reason: TransportError::Closed
            })
        );
    }

    #[tokio::test]
    async fn dead_driver_ends_session_immediately() {
        let (transport, requests) = ChannelTransport::channel();
        drop(requests);
        let (_event_tx, event_rx) = mpsc::channel(1);
        let (notice_tx, mut notice_rx) = mpsc::channel(4);

        let machine = run(Machine::new(), transport, event_rx, notice_tx).await;
        assert!(machine.is_finished());
        assert_eq!(
            notice_rx.recv().await,
            Some(Notice::Disconnected {
                reason: TransportError::Closed
            })
        );
    }
}
