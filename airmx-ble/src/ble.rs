//! BLE plumbing for AIRMX purifiers
//!
//! Finds the purifier by advertised name, wires up the pairing service's
//! write and notify characteristics, and pumps value notifications into the
//! channel the pairing driver consumes.

use std::time::Duration;

use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use airmx_pair::{Transport, TransportError};
use airmx_proto::ble::{
    DEVICE_NAME, NOTIFY_CHARACTERISTIC_UUID, SERVICE_UUID, WRITE_CHARACTERISTIC_UUID,
};

/// How long a discovery scan runs before giving up on the device.
const DISCOVERY_SCAN: Duration = Duration::from_secs(5);

/// Notifications buffered between the BLE stack and the pairing driver.
const NOTIFICATION_BUFFER: usize = 32;

/// A discovered BLE device
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    pub is_airmx: bool,
}

/// Parse UUID string into uuid::Uuid
fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("invalid UUID in airmx_proto")
}

fn connection_error(error: impl std::fmt::Display) -> TransportError {
    TransportError::Connection(error.to_string())
}

fn not_connected() -> TransportError {
    TransportError::Connection("not connected".to_string())
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, Box<dyn std::error::Error>> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters
        .into_iter()
        .next()
        .ok_or_else(|| "No Bluetooth adapter found".into())
}

/// Scan for BLE devices
///
/// Returns a list of discovered devices. AIRMX purifiers have
/// `is_airmx = true`.
pub async fn scan(duration_secs: u64) -> Result<Vec<DiscoveredDevice>, Box<dyn std::error::Error>> {
    let adapter = get_adapter().await?;

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_else(|| "Unknown".to_string());
            let address = peripheral.address().to_string();
            let rssi = props.rssi;
            let is_airmx = name.starts_with("AIRMX");

            devices.push(DiscoveredDevice {
                name,
                address,
                rssi,
                is_airmx,
            });
        }
    }

    adapter.stop_scan().await?;
    Ok(devices)
}

/// Find a purifier by name/address pattern, or find any AIRMX device
pub async fn find_device(
    adapter: &Adapter,
    target: Option<&str>,
) -> Result<Peripheral, btleplug::Error> {
    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(DISCOVERY_SCAN).await;

    let peripherals = adapter.peripherals().await?;

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let name = props.local_name.unwrap_or_default();
            let address = peripheral.address().to_string();

            let matches = match target {
                Some(t) => name.contains(t) || address.contains(t),
                None => name == DEVICE_NAME || name.starts_with("AIRMX"),
            };

            if matches {
                adapter.stop_scan().await?;
                log::info!("found {name} ({address})");
                return Ok(peripheral);
            }
        }
    }

    adapter.stop_scan().await?;
    Err(btleplug::Error::DeviceNotFound)
}

struct Connection {
    peripheral: Peripheral,
    write_characteristic: Characteristic,
    notify_characteristic: Characteristic,
    forwarder: Option<JoinHandle<()>>,
}

/// [`Transport`] over a btleplug peripheral.
///
/// One instance drives one pairing attempt; the pairing driver calls
/// `connect`, `subscribe`, `write_chunk`, and finally `disconnect`.
pub struct BleTransport {
    adapter: Adapter,
    target: Option<String>,
    connection: Option<Connection>,
}

impl BleTransport {
    /// Transport on a given adapter, targeting a device by name/address
    /// pattern, or any AIRMX purifier when `target` is `None`.
    pub fn new(adapter: Adapter, target: Option<String>) -> Self {
        Self {
            adapter,
            target,
            connection: None,
        }
    }

    /// Transport on the first Bluetooth adapter the platform offers.
    pub async fn with_default_adapter(target: Option<String>) -> Result<Self, TransportError> {
        let adapter = get_adapter().await.map_err(connection_error)?;
        Ok(Self::new(adapter, target))
    }
}

impl Transport for BleTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let peripheral = find_device(&self.adapter, self.target.as_deref())
            .await
            .map_err(connection_error)?;

        peripheral.connect().await.map_err(connection_error)?;
        peripheral
            .discover_services()
            .await
            .map_err(connection_error)?;

        let service_uuid = parse_uuid(SERVICE_UUID);
        if !peripheral.services().iter().any(|s| s.uuid == service_uuid) {
            return Err(TransportError::Connection(
                "pairing service not found".to_string(),
            ));
        }

        let characteristics = peripheral.characteristics();

        let write_characteristic = characteristics
            .iter()
            .find(|c| c.uuid == parse_uuid(WRITE_CHARACTERISTIC_UUID))
            .cloned()
            .ok_or_else(|| {
                TransportError::Connection("write characteristic not found".to_string())
            })?;

        let notify_characteristic = characteristics
            .iter()
            .find(|c| c.uuid == parse_uuid(NOTIFY_CHARACTERISTIC_UUID))
            .cloned()
            .ok_or_else(|| {
                TransportError::Connection("notify characteristic not found".to_string())
            })?;

        self.connection = Some(Connection {
            peripheral,
            write_characteristic,
            notify_characteristic,
            forwarder: None,
        });
        Ok(())
    }

    async fn write_chunk(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let connection = self.connection.as_ref().ok_or_else(not_connected)?;

        connection
            .peripheral
            .write(
                &connection.write_characteristic,
                bytes,
                WriteType::WithResponse,
            )
            .await
            .map_err(|error| TransportError::Write(error.to_string()))
    }

    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        let connection = self.connection.as_mut().ok_or_else(not_connected)?;

        connection
            .peripheral
            .subscribe(&connection.notify_characteristic)
            .await
            .map_err(connection_error)?;

        let mut notifications = connection
            .peripheral
            .notifications()
            .await
            .map_err(connection_error)?;

        let notify_uuid = connection.notify_characteristic.uuid;
        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);

        connection.forwarder = Some(tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != notify_uuid {
                    continue;
                }
                log::debug!("received {} bytes from device", notification.value.len());
                if tx.send(notification.value).await.is_err() {
                    // driver dropped its receiver, nothing left to feed
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        if let Some(forwarder) = connection.forwarder {
            forwarder.abort();
        }

        if let Err(error) = connection.peripheral.disconnect().await {
            log::warn!("disconnect failed: {error}");
        }
    }
}
