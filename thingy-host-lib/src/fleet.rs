use std::{future::Future, sync::Arc, time::Duration};

use futures::future::join_all;
use log::{info, warn};
use tokio::{sync::watch, task::JoinHandle, time::timeout};

use crate::{
    error::{Result, ThingyError},
    session::{DeviceSession, SessionOptions},
    transport::{DeviceDescriptor, Transport},
};

/// Extra time a scan may take beyond the requested duration.
const SCAN_GRACE: Duration = Duration::from_secs(5);

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Keeps the `discovered` order and stops looking once `wanted.len()`
/// devices matched.
pub fn filter_by_address<S: AsRef<str>>(
    discovered: &[DeviceDescriptor],
    wanted: &[S],
) -> Vec<DeviceDescriptor> {
    let mut devices = Vec::new();
    if wanted.is_empty() {
        return devices;
    }

    for device in discovered {
        if wanted
            .iter()
            .any(|address| address.as_ref().eq_ignore_ascii_case(&device.address))
        {
            devices.push(device.clone());
            if devices.len() == wanted.len() {
                break;
            }
        }
    }
    devices
}

struct RunningSession {
    address: String,
    task: JoinHandle<Result<()>>,
}

/// Runs one [`DeviceSession`] per wanted peripheral.
pub struct Fleet<T: Transport> {
    transport: Arc<T>,
    options: SessionOptions,
    running: Vec<RunningSession>,
    cancel: Option<watch::Sender<bool>>,
    scan_grace: Duration,
}

impl<T: Transport> Fleet<T> {
    pub fn new(transport: Arc<T>, options: SessionOptions) -> Self {
        Self {
            transport,
            options,
            running: Vec::new(),
            cancel: None,
            scan_grace: SCAN_GRACE,
        }
    }

    pub fn with_scan_grace(mut self, scan_grace: Duration) -> Self {
        self.scan_grace = scan_grace;
        self
    }

    pub fn running_sessions(&self) -> usize {
        self.running.len()
    }

    pub async fn discover(&self, scan_duration: Duration) -> Result<Vec<DeviceDescriptor>> {
        let scan = self.transport.scan(scan_duration);
        let devices = timeout(scan_duration + self.scan_grace, scan)
            .await
            .map_err(|_| ThingyError::DiscoveryTimeout(scan_duration))??;
        info!("{} device(s) discovered", devices.len());
        Ok(devices)
    }

    /// Connects every device concurrently; a device that fails to connect
    /// gets `None` and does not affect the others.
    pub async fn connect_all(&self, devices: Vec<DeviceDescriptor>) -> Vec<Option<DeviceSession<T>>> {
        join_all(devices.into_iter().map(|device| {
            let mut session = DeviceSession::new(self.transport.clone(), device, self.options.clone());
            async move {
                if session.connect().await {
                    Some(session)
                } else {
                    None
                }
            }
        }))
        .await
    }

    /// Discover, keep the allow-listed addresses, connect.
    pub async fn start<S: AsRef<str>>(
        &self,
        addresses: &[S],
        scan_duration: Duration,
    ) -> Result<Vec<DeviceSession<T>>> {
        let discovered = self.discover(scan_duration).await?;
        let devices = filter_by_address(&discovered, addresses);
        for address in addresses {
            if !devices
                .iter()
                .any(|device| device.address.eq_ignore_ascii_case(address.as_ref()))
            {
                warn!("{} was not found", address.as_ref());
            }
        }

        let sessions: Vec<DeviceSession<T>> =
            self.connect_all(devices).await.into_iter().flatten().collect();
        info!("{} session(s) connected", sessions.len());
        Ok(sessions)
    }

    /// Starts streaming on every session as an independent task.
    pub fn spawn_all(
        &mut self,
        sessions: Vec<DeviceSession<T>>,
        sampling_frequency: u16,
        recording_name: &str,
    ) {
        let cancel_rx = match &self.cancel {
            Some(cancel) => cancel.subscribe(),
            None => {
                let (cancel, cancel_rx) = watch::channel(false);
                self.cancel = Some(cancel);
                cancel_rx
            }
        };

        for mut session in sessions {
            let address = session.address().to_string();
            let recording_name = recording_name.to_string();
            let cancel_rx = cancel_rx.clone();
            let task = tokio::spawn(async move {
                session
                    .begin_streaming(sampling_frequency, &recording_name, cancel_rx)
                    .await
            });
            self.running.push(RunningSession { address, task });
        }
    }

    /// Cancels every session and waits for each one's cleanup in turn. Errors
    /// are reported per device and never stop the remaining cleanups.
    pub async fn stop_all(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(true);
        }

        println!("\nStopping...");
        for RunningSession { address, mut task } in self.running.drain(..) {
            match timeout(CLEANUP_TIMEOUT, &mut task).await {
                Ok(Ok(Ok(()))) => info!("{}: stopped", address),
                Ok(Ok(Err(e))) => warn!("{}: stopped with error: {}", address, e),
                Ok(Err(e)) => warn!("{}: session task failed: {}", address, e),
                Err(_) => {
                    warn!("{}: cleanup timed out after {:?}, aborting", address, CLEANUP_TIMEOUT);
                    task.abort();
                }
            }
        }
    }

    /// Streams on every session until `interrupt` resolves, then stops them all.
    pub async fn run_all<F: Future<Output = ()>>(
        &mut self,
        sessions: Vec<DeviceSession<T>>,
        sampling_frequency: u16,
        recording_name: &str,
        interrupt: F,
    ) {
        self.spawn_all(sessions, sampling_frequency, recording_name);
        interrupt.await;
        self.stop_all().await;
    }
}
