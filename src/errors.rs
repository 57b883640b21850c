//! Error taxonomy for the capture and serving core.

use crate::driver::{DeviceId, DriverCode};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CameraError>;

#[derive(Debug, Error)]
pub enum CameraError {
    /// Fewer than two cameras were enumerable at startup.
    #[error("two cameras not available (found {found})")]
    DeviceEnumeration { found: usize },

    /// A specific camera failed to open.
    #[error("could not initialize camera {id}: {reason}")]
    DeviceInit { id: DeviceId, reason: String },

    /// Buffer, format or region-of-interest configuration was rejected.
    #[error("could not configure camera {id}: {reason}")]
    DeviceConfig { id: DeviceId, reason: String },

    /// The freeze operation failed and the retry policy gave up.
    #[error("capture failed on camera {id}: driver code {code}")]
    CaptureFailed { id: DeviceId, code: DriverCode },

    /// The capture file could not be read back after the save step.
    #[error("could not load captured image {path}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reply endpoint could not be bound.
    #[error("could not bind reply endpoint {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
