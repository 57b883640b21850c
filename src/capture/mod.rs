mod device;
mod scheduler;

pub use device::{DeviceHandle, LEFT_DEVICE_ID, RIGHT_DEVICE_ID};
pub use scheduler::CaptureScheduler;

use crate::driver::{BufferSpec, DeviceId, Roi};
use std::path::PathBuf;

/// Full-sensor buffer allocation: the 10MP mode of the capture rig.
pub const SENSOR_WIDTH: u32 = 3840;
/// See [`SENSOR_WIDTH`].
pub const SENSOR_HEIGHT: u32 = 2748;
/// Bits per pixel of the allocated frame buffers.
pub const SENSOR_BITS_PER_PIXEL: u32 = 24;
/// Driver-specific color format code the cameras are configured with.
pub const COLOR_FORMAT: i32 = 21;
/// JPEG quality passed to the driver's save operation.
pub const JPEG_QUALITY: u8 = 80;

/// Region the sensor is restricted to when ROI capture is enabled.
pub const DEFAULT_ROI: Roi = Roi {
    x: 800,
    y: 1372,
    width: 3040,
    height: 406,
};

/// How the scheduler reacts to a freeze operation that reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// One attempt; on failure the capture call aborts with the driver code.
    SingleAttempt,
    /// Up to `attempts` freezes before giving up.
    Bounded { attempts: u32 },
    /// Loop until the driver reports success. No backoff, no escape; the
    /// serving loop relies on this to hand every request an image.
    UntilSuccess,
}

/// Capture configuration shared by both device handles.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Directory capture files are written to. Files accumulate; nothing
    /// in this system deletes them.
    pub output_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Region-of-interest restriction; `None` captures the full sensor.
    pub roi: Option<Roi>,
    pub buffer: BufferSpec,
    pub color_format: i32,
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("images"),
            retry: RetryPolicy::UntilSuccess,
            roi: None,
            buffer: BufferSpec {
                width: SENSOR_WIDTH,
                height: SENSOR_HEIGHT,
                bits_per_pixel: SENSOR_BITS_PER_PIXEL,
            },
            color_format: COLOR_FORMAT,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

/// One successful capture: the encoded bytes plus where they came from.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub device: DeviceId,
    /// Per-device sequence number the filename was derived from.
    pub sequence: u64,
    pub path: PathBuf,
}
