pub mod codec;
pub mod common;
pub mod config;
mod error;
mod fleet;
pub mod inference;
pub mod session;
pub mod transport;
pub mod window;
#[cfg(test)]
mod tests;

pub use error::{Result, ThingyError};
pub use fleet::{filter_by_address, Fleet};
pub use inference::{ClassLabel, InferenceAdapter, OnnxModel, ScoreModel, DEFAULT_LABELS};
pub use session::{DeviceSession, SessionOptions, SessionState, SessionStats};
pub use transport::{BtleplugTransport, DeviceDescriptor, NotificationHandler, Transport};
pub use window::{Window, WindowBuffer, DEFAULT_WINDOW_SIZE};
