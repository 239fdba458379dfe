mod btleplug_transport;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

pub use btleplug_transport::BtleplugTransport;

/// Called synchronously by the transport for every notification, in arrival order.
pub type NotificationHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub address: String,
    pub name: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }
}

/// The BLE operations a device session consumes.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    /// Passive scan for `timeout`, results in discovery order.
    async fn scan(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>>;

    async fn connect(&self, device: &DeviceDescriptor) -> Result<Self::Connection>;

    async fn write_characteristic(
        &self,
        connection: &Self::Connection,
        uuid: Uuid,
        payload: &[u8],
    ) -> Result<()>;

    async fn subscribe(
        &self,
        connection: &Self::Connection,
        uuid: Uuid,
        handler: NotificationHandler,
    ) -> Result<()>;

    async fn unsubscribe(&self, connection: &Self::Connection, uuid: Uuid) -> Result<()>;

    async fn disconnect(&self, connection: &Self::Connection) -> Result<()>;

    async fn is_connected(&self, connection: &Self::Connection) -> bool;
}
