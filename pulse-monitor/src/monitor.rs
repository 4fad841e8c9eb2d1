//! Live monitoring: wires the btleplug driver to a session and prints its notices

use std::time::Duration;

use log::{info, warn};
use tokio::sync::mpsc;

use pulse_ble::Driver;
use pulse_session::{ChannelTransport, Machine, Notice, Transport};

use crate::config::MonitorConfig;

pub async fn run(config: &MonitorConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = pulse_ble::ble::get_adapter(config.adapter_index).await?;
    let buffer = config.event_buffer.max(1);

    let (transport, requests) = ChannelTransport::channel();
    let (event_tx, event_rx) = mpsc::channel(buffer);
    let (notice_tx, mut notice_rx) = mpsc::channel(buffer);

    let driver = tokio::spawn(Driver::new(adapter, event_tx).run(requests));
    let session = tokio::spawn(pulse_session::run(
        Machine::new(),
        transport.clone(),
        event_rx,
        notice_tx,
    ));

    // kept to cancel the session from here
    let mut control = transport;
    let scan_deadline = tokio::time::sleep(Duration::from_secs(config.scan_timeout_secs));
    tokio::pin!(scan_deadline);
    let mut found = false;
    let mut timed_out = false;

    loop {
        tokio::select! {
            notice = notice_rx.recv() => {
                let Some(notice) = notice else { break };
                if matches!(notice, Notice::Connecting { .. }) {
                    found = true;
                }
                print_notice(&notice, json)?;
            }
            _ = &mut scan_deadline, if !found => {
                warn!("No heart rate sensor found within {}s", config.scan_timeout_secs);
                found = true;
                timed_out = true;
                if let Err(e) = control.disconnect() {
                    warn!("Disconnect request failed: {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting");
                if let Err(e) = control.disconnect() {
                    warn!("Disconnect request failed: {e}");
                }
            }
        }
    }

    let machine = session.await?;
    drop(control);
    driver.await??;

    if timed_out {
        return Err("no heart rate sensor found".into());
    }
    if let Some(state) = machine.session() {
        info!(
            "Session with {} ended: last {} bpm, sensor detected: {}",
            state.name,
            state.heart_rate_bpm(),
            state.sensor_detected()
        );
    }
    Ok(())
}

fn print_notice(notice: &Notice, json: bool) -> Result<(), serde_json::Error> {
    match notice {
        Notice::Changed(change) if json => println!("{}", serde_json::to_string(change)?),
        Notice::Changed(change) => println!("{change}"),
        Notice::DecodeFailed { .. } => warn!("{notice}"),
        _ if json => info!("{notice}"),
        _ => println!("{notice}"),
    }
    Ok(())
}
