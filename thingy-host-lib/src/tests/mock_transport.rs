use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::sleep;
use uuid::Uuid;

use crate::{
    error::{Result, ThingyError},
    transport::{DeviceDescriptor, NotificationHandler, Transport},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    Write(String, Uuid, Vec<u8>),
    Subscribe(String, Uuid),
    Unsubscribe(String, Uuid),
    Disconnect(String),
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    handlers: HashMap<(String, Uuid), NotificationHandler>,
    connected: HashSet<String>,
}

/// In-memory peripherals. The connection handle is the device address.
pub struct MockTransport {
    devices: Vec<DeviceDescriptor>,
    unreachable: HashSet<String>,
    rejecting_writes: HashSet<String>,
    failing_disconnects: HashSet<String>,
    scan_delay: Duration,
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new(addresses: &[&str]) -> Self {
        Self {
            devices: addresses
                .iter()
                .map(|address| DeviceDescriptor::new(*address, Some("Thingy".into())))
                .collect(),
            unreachable: HashSet::new(),
            rejecting_writes: HashSet::new(),
            failing_disconnects: HashSet::new(),
            scan_delay: Duration::ZERO,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_unreachable(mut self, address: &str) -> Self {
        self.unreachable.insert(address.to_string());
        self
    }

    pub fn with_rejected_writes(mut self, address: &str) -> Self {
        self.rejecting_writes.insert(address.to_string());
        self
    }

    pub fn with_failing_disconnect(mut self, address: &str) -> Self {
        self.failing_disconnects.insert(address.to_string());
        self
    }

    pub fn with_scan_delay(mut self, scan_delay: Duration) -> Self {
        self.scan_delay = scan_delay;
        self
    }

    pub fn device(&self, address: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(address, Some("Thingy".into()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, address: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                Call::Connect(a)
                | Call::Write(a, _, _)
                | Call::Subscribe(a, _)
                | Call::Unsubscribe(a, _)
                | Call::Disconnect(a) => a == address,
            })
            .collect()
    }

    pub fn writes_to(&self, address: &str, uuid: Uuid) -> Vec<Vec<u8>> {
        self.calls_for(address)
            .into_iter()
            .filter_map(|call| match call {
                Call::Write(_, written_uuid, payload) if written_uuid == uuid => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn is_linked(&self, address: &str) -> bool {
        self.state.lock().unwrap().connected.contains(address)
    }

    pub fn is_subscribed(&self, address: &str, uuid: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .handlers
            .contains_key(&(address.to_string(), uuid))
    }

    /// Delivers one notification synchronously. Returns `false` if nobody
    /// is subscribed.
    pub fn notify(&self, address: &str, uuid: Uuid, payload: &[u8]) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.handlers.get_mut(&(address.to_string(), uuid)) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    /// The peripheral goes away without the session asking for it.
    pub fn drop_connection(&self, address: &str) {
        let mut state = self.state.lock().unwrap();
        state.connected.remove(address);
        state.handlers.retain(|(a, _), _| a != address);
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Connection = String;

    async fn scan(&self, _timeout: Duration) -> Result<Vec<DeviceDescriptor>> {
        sleep(self.scan_delay).await;
        Ok(self.devices.clone())
    }

    async fn connect(&self, device: &DeviceDescriptor) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Connect(device.address.clone()));
        if self.unreachable.contains(&device.address) {
            return Err(ThingyError::ConnectFailure {
                address: device.address.clone(),
                reason: "unreachable".into(),
            });
        }
        state.connected.insert(device.address.clone());
        Ok(device.address.clone())
    }

    async fn write_characteristic(&self, connection: &String, uuid: Uuid, payload: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected.contains(connection) {
            return Err(ThingyError::CharacteristicWriteFailure {
                uuid,
                reason: "not connected".into(),
            });
        }
        if self.rejecting_writes.contains(connection) {
            return Err(ThingyError::CharacteristicWriteFailure {
                uuid,
                reason: "write rejected".into(),
            });
        }
        state
            .calls
            .push(Call::Write(connection.clone(), uuid, payload.to_vec()));
        Ok(())
    }

    async fn subscribe(&self, connection: &String, uuid: Uuid, handler: NotificationHandler) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected.contains(connection) {
            return Err(ThingyError::SubscribeFailure {
                uuid,
                reason: "not connected".into(),
            });
        }
        state.calls.push(Call::Subscribe(connection.clone(), uuid));
        state.handlers.insert((connection.clone(), uuid), handler);
        Ok(())
    }

    async fn unsubscribe(&self, connection: &String, uuid: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Unsubscribe(connection.clone(), uuid));
        state.handlers.remove(&(connection.clone(), uuid));
        Ok(())
    }

    async fn disconnect(&self, connection: &String) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Disconnect(connection.clone()));
        state.connected.remove(connection);
        state.handlers.retain(|(a, _), _| a != connection);
        if self.failing_disconnects.contains(connection) {
            return Err(ThingyError::DisconnectFailure {
                address: connection.clone(),
                reason: "link lost".into(),
            });
        }
        Ok(())
    }

    async fn is_connected(&self, connection: &String) -> bool {
        self.state.lock().unwrap().connected.contains(connection)
    }
}
