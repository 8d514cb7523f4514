/// BlueZ-backed transport built on bluer
use bluer::gatt::remote::{Characteristic, CharacteristicWriteRequest};
use bluer::gatt::WriteOp;
use bluer::{Address, Device, ErrorKind};
use log::{debug, error, warn};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

use crate::bluetooth::transport::Transport;
use crate::error::TransportError;

// GAP device name; BlueZ keeps the Generic Access service to itself
const DEVICE_NAME_HANDLE: u16 = 0x03;
const SERVICES_RESOLVE_POLL_MS: u64 = 100;
const SERVICES_RESOLVE_ATTEMPTS: u32 = 50;

impl From<bluer::Error> for TransportError {
    fn from(e: bluer::Error) -> Self {
        match &e.kind {
            ErrorKind::InvalidArguments | ErrorKind::InvalidLength | ErrorKind::NotSupported => {
                TransportError::Rejected(e.to_string())
            }
            _ => TransportError::Link(e.to_string()),
        }
    }
}

/// Map the adapter identifier to a BlueZ adapter name ("0" -> "hci0")
pub fn adapter_name(adapter: &str) -> String {
    if adapter.starts_with("hci") {
        adapter.to_string()
    } else {
        format!("hci{}", adapter)
    }
}

/// An open GATT connection with its characteristics indexed by value handle
pub struct BluerSession {
    device: Device,
    characteristics: HashMap<u16, Characteristic>,
}

impl BluerSession {
    fn characteristic(&self, handle: u16) -> Result<&Characteristic, TransportError> {
        self.characteristics.get(&handle).ok_or_else(|| {
            TransportError::Rejected(format!("no characteristic with handle {:#06x}", handle))
        })
    }
}

pub struct BluerTransport {
    session: bluer::Session,
}

impl BluerTransport {
    pub async fn new() -> Result<Self, TransportError> {
        let session = match bluer::Session::new().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to create Bluetooth session: {}", e);
                return Err(e.into());
            }
        };
        Ok(BluerTransport { session })
    }

    async fn wait_for_services(device: &Device) -> Result<(), TransportError> {
        for _ in 0..SERVICES_RESOLVE_ATTEMPTS {
            if device.is_services_resolved().await? {
                return Ok(());
            }
            sleep(Duration::from_millis(SERVICES_RESOLVE_POLL_MS)).await;
        }
        Err(TransportError::Link("timed out waiting for GATT services".to_string()))
    }

    async fn index_characteristics(
        device: &Device,
    ) -> Result<HashMap<u16, Characteristic>, TransportError> {
        let mut characteristics = HashMap::new();
        for service in device.services().await? {
            for characteristic in service.characteristics().await? {
                // BlueZ numbers characteristics by their declaration handle;
                // the value attribute follows directly after it
                let value_handle = characteristic.id().wrapping_add(1);
                debug!(
                    "Service {:#06x}: characteristic value handle {:#06x}",
                    service.id(),
                    value_handle
                );
                characteristics.insert(value_handle, characteristic);
            }
        }
        Ok(characteristics)
    }
}

impl Transport for BluerTransport {
    type Session = BluerSession;

    async fn connect(&self, address: &str, adapter: &str) -> Result<BluerSession, TransportError> {
        let address: Address = address
            .parse()
            .map_err(|e| TransportError::Rejected(format!("invalid address {}: {}", address, e)))?;

        let adapter = self.session.adapter(&adapter_name(adapter))?;
        adapter.set_powered(true).await?;

        let device = adapter.device(address)?;
        if !device.is_connected().await? {
            device.connect().await?;
        }
        debug!("Connected to device {}", address);

        let characteristics = match Self::wait_for_services(&device).await {
            Ok(()) => Self::index_characteristics(&device).await,
            Err(e) => Err(e),
        };

        match characteristics {
            Ok(characteristics) => Ok(BluerSession {
                device,
                characteristics,
            }),
            Err(e) => {
                // The caller never sees a session for a failed connect
                if let Err(disconnect_err) = device.disconnect().await {
                    warn!("Failed to disconnect {}: {}", address, disconnect_err);
                }
                Err(e)
            }
        }
    }

    async fn read_characteristic(
        &self,
        session: &BluerSession,
        handle: u16,
    ) -> Result<Vec<u8>, TransportError> {
        if handle == DEVICE_NAME_HANDLE && !session.characteristics.contains_key(&handle) {
            let name = session.device.name().await?.unwrap_or_default();
            return Ok(name.into_bytes());
        }

        let value = session.characteristic(handle)?.read().await?;
        Ok(value)
    }

    async fn write_characteristic(
        &self,
        session: &BluerSession,
        handle: u16,
        value: &[u8],
        wait_for_response: bool,
    ) -> Result<(), TransportError> {
        let request = CharacteristicWriteRequest {
            op_type: if wait_for_response {
                WriteOp::Request
            } else {
                WriteOp::Command
            },
            ..Default::default()
        };
        session
            .characteristic(handle)?
            .write_ext(value, &request)
            .await?;
        Ok(())
    }

    async fn disconnect(&self, session: BluerSession) {
        if let Err(e) = session.device.disconnect().await {
            warn!("Failed to disconnect {}: {}", session.device.address(), e);
        }
    }
}
