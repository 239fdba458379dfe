mod pipeline;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, error, info, warn};
use tokio::{sync::watch, time::sleep};

use crate::{
    codec::{encode_led_status, MotionConfig},
    common::{
        recording_path,
        uuids::{TMS_CONF_UUID, TMS_RAW_DATA_UUID, UIS_LED_UUID},
        SampleCSVWriter,
    },
    error::{Result, ThingyError},
    inference::InferenceAdapter,
    transport::{DeviceDescriptor, NotificationHandler, Transport},
    window::DEFAULT_WINDOW_SIZE,
};

use pipeline::SamplePipeline;
pub use pipeline::SessionStats;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Configuring,
    Streaming,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancelled,
    TransportDisconnected,
}

/// Settings shared by every session of a fleet.
#[derive(Clone)]
pub struct SessionOptions {
    /// `None` records samples without classifying them.
    pub classifier: Option<Arc<InferenceAdapter>>,
    pub output_dir: PathBuf,
    pub motion_config: MotionConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            classifier: None,
            output_dir: PathBuf::from("."),
            motion_config: MotionConfig::default(),
        }
    }
}

/// One connected Thingy: connection, sample log and window buffer.
pub struct DeviceSession<T: Transport> {
    transport: Arc<T>,
    device: DeviceDescriptor,
    options: SessionOptions,
    state: SessionState,
    connection: Option<T::Connection>,
    was_connected: bool,
    subscribed: bool,
    pipeline: Option<Arc<Mutex<SamplePipeline>>>,
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: Arc<T>, device: DeviceDescriptor, options: SessionOptions) -> Self {
        Self {
            transport,
            device,
            options,
            state: SessionState::Disconnected,
            connection: None,
            was_connected: false,
            subscribed: false,
            pipeline: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.device.address
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.pipeline
            .as_ref()
            .and_then(|pipeline| pipeline.lock().ok().map(|p| p.stats().clone()))
            .unwrap_or_default()
    }

    /// Samples waiting in the current partial window.
    pub fn buffered_samples(&self) -> usize {
        self.pipeline
            .as_ref()
            .and_then(|pipeline| pipeline.lock().ok().map(|p| p.buffered_samples()))
            .unwrap_or(0)
    }

    fn window_size(&self) -> usize {
        self.options
            .classifier
            .as_ref()
            .map_or(DEFAULT_WINDOW_SIZE, |classifier| classifier.window_size())
    }

    fn connection(&self) -> Result<T::Connection> {
        self.connection
            .clone()
            .ok_or(ThingyError::SessionNotConnected)
    }

    /// Returns `false` when the peripheral can't be reached or rejects the
    /// LED write; the link is dropped again in that case.
    pub async fn connect(&mut self) -> bool {
        if self.connection.is_some() {
            warn!("{}: already connected", self.device.address);
            return true;
        }

        println!("Connecting to {}", self.device.address);
        self.state = SessionState::Connecting;
        match self.transport.connect(&self.device).await {
            Ok(connection) => {
                self.connection = Some(connection);
                if let Err(e) = self.set_led_status("connected").await {
                    println!("Failed to set LED on {}: {}", self.device.address, e);
                    if let Some(connection) = self.connection.take() {
                        if let Err(e) = self.transport.disconnect(&connection).await {
                            warn!("{}: disconnect after failed setup: {}", self.device.address, e);
                        }
                    }
                    self.state = SessionState::Disconnected;
                    return false;
                }

                self.was_connected = true;
                self.state = SessionState::Connected;
                println!("Connected to {}", self.device.address);
                true
            }
            Err(e) => {
                println!("Failed to connect to {}: {}", self.device.address, e);
                self.state = SessionState::Disconnected;
                false
            }
        }
    }

    /// Unknown statuses write nothing.
    pub async fn set_led_status(&self, status: &str) -> Result<()> {
        let connection = self.connection()?;
        match encode_led_status(status) {
            Some(payload) => {
                self.transport
                    .write_characteristic(&connection, UIS_LED_UUID, &payload)
                    .await
            }
            None => {
                debug!("{}: no LED payload for status {:?}", self.device.address, status);
                Ok(())
            }
        }
    }

    /// Opens the sample log, configures the motion service, subscribes to raw
    /// motion data and switches the LED to recording.
    pub async fn start_streaming(&mut self, sampling_frequency: u16, recording_name: &str) -> Result<()> {
        let connection = self.connection()?;
        self.state = SessionState::Configuring;

        let log_path = recording_path(&self.options.output_dir, &self.device.address, recording_name);
        let log = SampleCSVWriter::open_append(&log_path)?;
        info!("{}: recording to {:?}", self.device.address, log.path());
        let pipeline = Arc::new(Mutex::new(SamplePipeline::new(
            self.device.address.clone(),
            log,
            self.window_size(),
            self.options.classifier.clone(),
        )));
        self.pipeline = Some(pipeline.clone());

        let payload = self
            .options
            .motion_config
            .with_motion_processing_frequency(sampling_frequency)
            .encode();
        self.transport
            .write_characteristic(&connection, TMS_CONF_UUID, &payload)
            .await?;

        let handler: NotificationHandler = Box::new(move |raw: &[u8]| match pipeline.lock() {
            Ok(mut pipeline) => pipeline.handle_notification(raw),
            Err(_) => error!("sample pipeline poisoned, notification dropped"),
        });
        self.transport
            .subscribe(&connection, TMS_RAW_DATA_UUID, handler)
            .await?;
        self.subscribed = true;

        self.set_led_status("recording").await?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Streams until `cancel` flips to `true` (or its sender is dropped) or the
    /// transport reports the peripheral gone, then stops notifications and
    /// disconnects.
    pub async fn begin_streaming(
        &mut self,
        sampling_frequency: u16,
        recording_name: &str,
        cancel: watch::Receiver<bool>,
    ) -> Result<()> {
        if let Err(e) = self.start_streaming(sampling_frequency, recording_name).await {
            println!("{}: failed to start streaming: {}", self.device.address, e);
            if let Err(cleanup_error) = self.shutdown().await {
                warn!("{}: cleanup failed: {}", self.device.address, cleanup_error);
            }
            return Err(e);
        }

        let reason = self.wait_until_stopped(cancel).await;
        info!("{}: stopping ({:?})", self.device.address, reason);
        self.shutdown().await
    }

    async fn wait_until_stopped(&self, mut cancel: watch::Receiver<bool>) -> StopReason {
        let Ok(connection) = self.connection() else {
            return StopReason::TransportDisconnected;
        };

        loop {
            if *cancel.borrow() {
                return StopReason::Cancelled;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() {
                        return StopReason::Cancelled;
                    }
                }
                _ = sleep(POLL_INTERVAL) => {
                    if !self.transport.is_connected(&connection).await {
                        warn!("{}: peripheral disconnected", self.device.address);
                        return StopReason::TransportDisconnected;
                    }
                }
            }
        }
    }

    pub async fn stop_notify(&mut self) -> Result<()> {
        if !self.subscribed {
            return Ok(());
        }
        let connection = self.connection()?;
        self.subscribed = false;
        self.transport
            .unsubscribe(&connection, TMS_RAW_DATA_UUID)
            .await
    }

    /// Stop notifications, then disconnect. Both steps always run; the first
    /// error is returned.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.connection.is_some() {
            self.state = SessionState::Disconnecting;
        }

        let unsubscribed = self.stop_notify().await;
        if let Err(e) = &unsubscribed {
            println!("{}: failed to stop notifications: {}", self.device.address, e);
        }
        let disconnected = self.disconnect().await;
        if let Err(e) = &disconnected {
            println!("{}: failed to disconnect: {}", self.device.address, e);
        }

        unsubscribed.and(disconnected)
    }

    /// Stops notifications, closes the sample log, then the connection.
    /// Calling it again after it succeeded is a no-op.
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.was_connected {
            return Err(ThingyError::SessionNotConnected);
        }
        let Some(connection) = self.connection.clone() else {
            debug!("{}: already disconnected", self.device.address);
            return Ok(());
        };

        println!("\nDisconnecting from {}", self.device.address);
        self.state = SessionState::Disconnecting;
        if let Err(e) = self.stop_notify().await {
            warn!("{}: failed to stop notifications: {}", self.device.address, e);
        }
        let closed = self.close_log();
        self.connection = None;
        let disconnected = self.transport.disconnect(&connection).await;
        self.state = SessionState::Disconnected;

        disconnected.and(closed)
    }

    fn close_log(&mut self) -> Result<()> {
        match &self.pipeline {
            Some(pipeline) => match pipeline.lock() {
                Ok(mut pipeline) => pipeline.close(),
                Err(poisoned) => poisoned.into_inner().close(),
            },
            None => Ok(()),
        }
    }
}

impl<T: Transport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close_log() {
            warn!("{}: failed to close sample log: {}", self.device.address, e);
        }
    }
}
