use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use btleplug::{
    api::{
        BDAddr, Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
        WriteType,
    },
    platform::{Adapter, Manager, Peripheral, PeripheralId},
};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::{task::JoinHandle, time::timeout};
use uuid::Uuid;

use super::{DeviceDescriptor, NotificationHandler, Transport};
use crate::error::{Result, ThingyError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DISCOVER_SERVICES_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct ThingyPeripheral {
    address: String,
    peripheral: Peripheral,
}

/// Host BLE stack through btleplug, using the first adapter found.
pub struct BtleplugTransport {
    _manager: Manager,
    adapter: Adapter,
    peripherals: Mutex<HashMap<String, Peripheral>>,
    notification_tasks: Arc<Mutex<HashMap<(String, Uuid), JoinHandle<()>>>>,
}

impl BtleplugTransport {
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(ThingyError::NoAdapter)?;
        info!("Using adapter {}", adapter.adapter_info().await?);

        Ok(Self {
            _manager: manager,
            adapter,
            peripherals: Mutex::new(HashMap::new()),
            notification_tasks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn abort_notification_tasks(&self, address: &str, uuid: Option<Uuid>) {
        let mut tasks = self.notification_tasks.lock().unwrap();
        tasks.retain(|(task_address, task_uuid), task| {
            let matches = task_address == address && uuid.map_or(true, |uuid| uuid == *task_uuid);
            if matches {
                task.abort();
            }
            !matches
        });
    }
}

/// CoreBluetooth hides MAC addresses and reports all zeroes, so the
/// platform peripheral id stands in for the address there.
fn display_address(address: BDAddr, id: &PeripheralId) -> String {
    address_or_else(address, || id.to_string())
}

fn address_or_else<F: FnOnce() -> String>(address: BDAddr, fallback: F) -> String {
    if address == BDAddr::default() {
        fallback()
    } else {
        address.to_string()
    }
}

fn find_characteristic(peripheral: &Peripheral, uuid: Uuid) -> Option<Characteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|characteristic| characteristic.uuid == uuid)
}

#[async_trait]
impl Transport for BtleplugTransport {
    type Connection = ThingyPeripheral;

    async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>> {
        let mut events = self.adapter.events().await?;
        info!("Scanning for {:?}", duration);
        self.adapter.start_scan(ScanFilter::default()).await?;

        let mut discovered: Vec<PeripheralId> = Vec::new();
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => match event {
                    Some(CentralEvent::DeviceDiscovered(id)) => {
                        if !discovered.contains(&id) {
                            discovered.push(id);
                        }
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
        if let Err(e) = self.adapter.stop_scan().await {
            debug!("Failed to stop scan cleanly: {}", e);
        }
        info!("End scanning");

        // peripherals cached by the OS before this scan are not re-announced
        for peripheral in self.adapter.peripherals().await? {
            if !discovered.contains(&peripheral.id()) {
                discovered.push(peripheral.id());
            }
        }

        let mut devices = Vec::with_capacity(discovered.len());
        for id in discovered {
            let peripheral = self.adapter.peripheral(&id).await?;
            let properties = peripheral.properties().await?;
            let address = display_address(
                properties
                    .as_ref()
                    .map_or(peripheral.address(), |p| p.address),
                &id,
            );
            let name = properties.and_then(|p| p.local_name);
            info!(
                "Device discovered: {} ({})",
                name.as_deref().unwrap_or("unknown"),
                address
            );
            self.peripherals
                .lock()
                .unwrap()
                .insert(address.clone(), peripheral);
            devices.push(DeviceDescriptor::new(address, name));
        }

        Ok(devices)
    }

    async fn connect(&self, device: &DeviceDescriptor) -> Result<ThingyPeripheral> {
        let connect_failure = |reason: String| ThingyError::ConnectFailure {
            address: device.address.clone(),
            reason,
        };

        let peripheral = self
            .peripherals
            .lock()
            .unwrap()
            .get(&device.address)
            .cloned()
            .ok_or_else(|| connect_failure("device was not discovered".into()))?;

        timeout(CONNECT_TIMEOUT, peripheral.connect())
            .await
            .map_err(|_| connect_failure(format!("timed out after {:?}", CONNECT_TIMEOUT)))?
            .map_err(|e| connect_failure(e.to_string()))?;

        timeout(DISCOVER_SERVICES_TIMEOUT, peripheral.discover_services())
            .await
            .map_err(|_| {
                connect_failure(format!(
                    "service discovery timed out after {:?}",
                    DISCOVER_SERVICES_TIMEOUT
                ))
            })?
            .map_err(|e| connect_failure(e.to_string()))?;

        Ok(ThingyPeripheral {
            address: device.address.clone(),
            peripheral,
        })
    }

    async fn write_characteristic(
        &self,
        connection: &ThingyPeripheral,
        uuid: Uuid,
        payload: &[u8],
    ) -> Result<()> {
        let characteristic = find_characteristic(&connection.peripheral, uuid).ok_or_else(|| {
            ThingyError::CharacteristicWriteFailure {
                uuid,
                reason: "characteristic not found".into(),
            }
        })?;
        connection
            .peripheral
            .write(&characteristic, payload, WriteType::WithResponse)
            .await
            .map_err(|e| ThingyError::CharacteristicWriteFailure {
                uuid,
                reason: e.to_string(),
            })
    }

    async fn subscribe(
        &self,
        connection: &ThingyPeripheral,
        uuid: Uuid,
        mut handler: NotificationHandler,
    ) -> Result<()> {
        let subscribe_failure = |reason: String| ThingyError::SubscribeFailure { uuid, reason };

        let characteristic = find_characteristic(&connection.peripheral, uuid)
            .ok_or_else(|| subscribe_failure("characteristic not found".into()))?;

        // take the stream before subscribing so the first notifications aren't lost
        let mut notifications = connection
            .peripheral
            .notifications()
            .await
            .map_err(|e| subscribe_failure(e.to_string()))?;
        connection
            .peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| subscribe_failure(e.to_string()))?;

        let address = connection.address.clone();
        let task = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid == uuid {
                    handler(&notification.value);
                }
            }
            debug!("Notification stream of {} ended", address);
        });

        if let Some(previous) = self
            .notification_tasks
            .lock()
            .unwrap()
            .insert((connection.address.clone(), uuid), task)
        {
            warn!("Replacing existing subscription to {} on {}", uuid, connection.address);
            previous.abort();
        }

        Ok(())
    }

    async fn unsubscribe(&self, connection: &ThingyPeripheral, uuid: Uuid) -> Result<()> {
        self.abort_notification_tasks(&connection.address, Some(uuid));

        let unsubscribe_failure = |reason: String| ThingyError::UnsubscribeFailure { uuid, reason };
        let characteristic = find_characteristic(&connection.peripheral, uuid)
            .ok_or_else(|| unsubscribe_failure("characteristic not found".into()))?;
        connection
            .peripheral
            .unsubscribe(&characteristic)
            .await
            .map_err(|e| unsubscribe_failure(e.to_string()))
    }

    async fn disconnect(&self, connection: &ThingyPeripheral) -> Result<()> {
        self.abort_notification_tasks(&connection.address, None);

        connection
            .peripheral
            .disconnect()
            .await
            .map_err(|e| ThingyError::DisconnectFailure {
                address: connection.address.clone(),
                reason: e.to_string(),
            })
    }

    async fn is_connected(&self, connection: &ThingyPeripheral) -> bool {
        connection.peripheral.is_connected().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mac_address_kept() {
        let address = BDAddr::from([0xFD, 0xCD, 0xF2, 0x2A, 0xC9, 0x6A]);
        assert_eq!(
            address_or_else(address, || "fallback".into()),
            "FD:CD:F2:2A:C9:6A"
        );
    }

    #[test]
    fn test_zero_address_falls_back() {
        let id = "5d7ff4a2-6f5c-4e83-9d2b-3f0c2e7a11b4".to_string();
        assert_eq!(address_or_else(BDAddr::default(), || id.clone()), id);
    }
}
