use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ThingyError {
    #[error("scan did not finish within {0:?}")]
    DiscoveryTimeout(Duration),
    #[error("no bluetooth adapter found")]
    NoAdapter,
    #[error("failed to connect to {address}: {reason}")]
    ConnectFailure { address: String, reason: String },
    #[error("session is not connected")]
    SessionNotConnected,
    #[error("malformed payload: expected {expected} bytes, got {actual}")]
    MalformedPayload { expected: usize, actual: usize },
    #[error("model input shape mismatch: expected {expected:?}, got {actual:?}")]
    ModelInputShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("model produces {model_outputs} scores but {labels} labels were given")]
    LabelCountMismatch { model_outputs: usize, labels: usize },
    #[error("write to characteristic {uuid} failed: {reason}")]
    CharacteristicWriteFailure { uuid: Uuid, reason: String },
    #[error("subscribe to characteristic {uuid} failed: {reason}")]
    SubscribeFailure { uuid: Uuid, reason: String },
    #[error("unsubscribe from characteristic {uuid} failed: {reason}")]
    UnsubscribeFailure { uuid: Uuid, reason: String },
    #[error("disconnect from {address} failed: {reason}")]
    DisconnectFailure { address: String, reason: String },
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),
    #[error("model error: {0}")]
    Model(#[from] anyhow::Error),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ThingyError>;
