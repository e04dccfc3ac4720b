// BLE Transport Implementation
// Carries SMP packets over the SMP GATT characteristic
//
// The link is driven by btleplug when built with the `ble` feature. Without
// it the transport still selects and reports itself, but connecting fails.

use crate::transport::{SmpTransport, TransportError, TransportKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SMP GATT service UUID
pub const SMP_SERVICE_UUID: u128 = 0x8D53DC1D_1DB7_4CD3_868B_8A527460AA84;
/// SMP GATT characteristic UUID
pub const SMP_CHARACTERISTIC_UUID: u128 = 0xDA2E7828_FBCE_4E01_AE9E_261174997C48;
/// Default payload budget for one write without response
pub const DEFAULT_BLE_MTU: usize = 244;

// ============================================================================
// BLE TRANSPORT CONFIG
// ============================================================================

/// Configuration for BLE transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleConfig {
    /// MAC address (or platform identifier) or advertised name
    pub address: String,
    pub mtu: usize,
    /// Interval between scans of the adapter's peripheral list
    pub scan_interval: Duration,
}

impl BleConfig {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            mtu: DEFAULT_BLE_MTU,
            scan_interval: Duration::from_millis(250),
        }
    }

    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu.max(20); // BLE minimum
        self
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Whether a peripheral's address or name identifies the configured device
    pub fn matches(&self, address: &str, name: Option<&str>) -> bool {
        address.eq_ignore_ascii_case(&self.address) || name == Some(self.address.as_str())
    }
}

// ============================================================================
// BLE TRANSPORT
// ============================================================================

pub struct BleTransport {
    config: BleConfig,
    #[cfg(feature = "ble")]
    link: Option<link::BleLink>,
}

impl BleTransport {
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            #[cfg(feature = "ble")]
            link: None,
        }
    }

    pub fn config(&self) -> &BleConfig {
        &self.config
    }
}

#[cfg(feature = "ble")]
#[async_trait]
impl SmpTransport for BleTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.link = Some(link::BleLink::open(&self.config).await?);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(link) = self.link.take() {
            link.close().await?;
        }
        Ok(())
    }

    async fn send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotConnected)?;
        link.send(packet, self.config.mtu).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotConnected)?;
        link.receive().await
    }

    fn max_unencoded_size(&self) -> usize {
        self.config.mtu
    }

    fn address(&self) -> String {
        self.config.address.clone()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }
}

#[cfg(not(feature = "ble"))]
#[async_trait]
impl SmpTransport for BleTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        Err(TransportError::Unsupported(
            "BLE support is not compiled in; rebuild with `--features ble`".to_string(),
        ))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&mut self, _packet: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::NotConnected)
    }

    async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        Err(TransportError::NotConnected)
    }

    fn max_unencoded_size(&self) -> usize {
        self.config.mtu
    }

    fn address(&self) -> String {
        self.config.address.clone()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }
}

#[cfg(feature = "ble")]
mod link {
    use super::{BleConfig, SMP_CHARACTERISTIC_UUID, SMP_SERVICE_UUID};
    use crate::smp::PacketAssembler;
    use crate::transport::TransportError;
    use btleplug::api::{
        Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, ValueNotification,
        WriteType,
    };
    use btleplug::platform::{Manager, Peripheral};
    use futures::stream::{Stream, StreamExt};
    use std::pin::Pin;
    use tracing::{debug, info};
    use uuid::Uuid;

    type Notifications = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

    fn ble_error(e: btleplug::Error) -> TransportError {
        TransportError::ConnectionFailed(e.to_string())
    }

    pub(super) struct BleLink {
        peripheral: Peripheral,
        characteristic: Characteristic,
        notifications: Notifications,
        assembler: PacketAssembler,
    }

    impl BleLink {
        /// Scan until the configured device shows up, then connect and subscribe
        ///
        /// Scanning has no deadline of its own; the caller's connect timeout
        /// cancels it.
        pub(super) async fn open(config: &BleConfig) -> Result<Self, TransportError> {
            let manager = Manager::new().await.map_err(ble_error)?;
            let adapter = manager
                .adapters()
                .await
                .map_err(ble_error)?
                .into_iter()
                .next()
                .ok_or_else(|| TransportError::HardwareUnavailable("no Bluetooth adapter".to_string()))?;

            let service = Uuid::from_u128(SMP_SERVICE_UUID);
            adapter
                .start_scan(ScanFilter { services: vec![service] })
                .await
                .map_err(ble_error)?;

            let peripheral = loop {
                let mut found = None;
                for peripheral in adapter.peripherals().await.map_err(ble_error)? {
                    let name = peripheral
                        .properties()
                        .await
                        .map_err(ble_error)?
                        .and_then(|p| p.local_name);
                    if config.matches(&peripheral.address().to_string(), name.as_deref()) {
                        found = Some(peripheral);
                        break;
                    }
                }
                if let Some(peripheral) = found {
                    break peripheral;
                }
                tokio::time::sleep(config.scan_interval).await;
            };
            adapter.stop_scan().await.map_err(ble_error)?;

            info!("Found {}, connecting", config.address);
            peripheral.connect().await.map_err(ble_error)?;
            peripheral.discover_services().await.map_err(ble_error)?;

            let uuid = Uuid::from_u128(SMP_CHARACTERISTIC_UUID);
            let characteristic = peripheral
                .characteristics()
                .into_iter()
                .find(|c| c.uuid == uuid)
                .ok_or_else(|| {
                    TransportError::ConnectionFailed("device has no SMP characteristic".to_string())
                })?;

            peripheral.subscribe(&characteristic).await.map_err(ble_error)?;
            let notifications = peripheral.notifications().await.map_err(ble_error)?;
            debug!("Subscribed to SMP characteristic {}", uuid);

            Ok(Self {
                peripheral,
                characteristic,
                notifications,
                assembler: PacketAssembler::new(),
            })
        }

        pub(super) async fn send(&mut self, packet: &[u8], mtu: usize) -> Result<(), TransportError> {
            for chunk in packet.chunks(mtu.max(1)) {
                self.peripheral
                    .write(&self.characteristic, chunk, WriteType::WithoutResponse)
                    .await
                    .map_err(|e| TransportError::IoError(e.to_string()))?;
            }
            Ok(())
        }

        pub(super) async fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
            loop {
                if let Some(packet) = self.assembler.next_packet()? {
                    return Ok(packet);
                }
                match self.notifications.next().await {
                    Some(n) if n.uuid == self.characteristic.uuid => self.assembler.push(&n.value),
                    Some(_) => continue,
                    None => return Err(TransportError::Closed),
                }
            }
        }

        pub(super) async fn close(self) -> Result<(), TransportError> {
            self.peripheral
                .disconnect()
                .await
                .map_err(|e| TransportError::IoError(e.to_string()))
        }
    }
}
