mod nokhwa_driver;

pub use nokhwa_driver::NokhwaDriver;

#[cfg(test)]
pub mod mock;

use std::path::Path;

use anyhow::Result;

/// Stable numeric identifier of a physical camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a driver-allocated image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferToken(pub u32);

/// Dimensions and depth of a frame buffer to allocate on the driver side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSpec {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
}

/// Sub-rectangle of the sensor restricting which pixels are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Raw numeric result code returned by driver operations that report
/// status instead of failing hard (freeze, save).
pub type DriverCode = i32;

/// Result codes shared between driver backends. Backends that wrap a
/// vendor library translate the vendor's codes into these.
pub const CODE_SUCCESS: DriverCode = 0;
pub const CODE_NO_SUCCESS: DriverCode = -1;
pub const CODE_INVALID_PARAMETER: DriverCode = 125;
pub const CODE_CORRUPT_SOURCE: DriverCode = 182;
pub const CODE_FILE_OPEN_ERROR: DriverCode = 183;
pub const CODE_NOT_SUPPORTED: DriverCode = 155;

/// Parameter block for the save-buffer-to-file operation. The driver
/// requires filename, buffer and buffer id to travel together.
#[derive(Debug)]
pub struct SaveRequest<'a> {
    pub path: &'a Path,
    pub buffer: BufferToken,
    pub quality: u8,
}

/// Opaque capability provided by the vendor camera stack.
///
/// The serving core treats the driver as a black box: it can enumerate
/// devices, open and close them, manage frame buffers, trigger a blocking
/// capture, and persist the current buffer as a JPEG file. `freeze` and
/// `save_image` report numeric codes rather than `Result` because the
/// callers retry or classify them instead of propagating.
pub trait CameraDriver {
    /// Number of physical cameras currently enumerable.
    fn device_count(&mut self) -> Result<usize>;

    /// Open the camera with the given id and enable automatic resource
    /// release should the device be removed on the fly.
    fn open(&mut self, id: DeviceId) -> Result<()>;

    /// Allocate a frame buffer for the opened camera.
    fn alloc_buffer(&mut self, id: DeviceId, spec: &BufferSpec) -> Result<BufferToken>;

    /// Make the given buffer the active capture target for the camera.
    fn bind_buffer(&mut self, id: DeviceId, buffer: BufferToken) -> Result<()>;

    /// Configure the driver-specific color format code.
    fn set_color_format(&mut self, id: DeviceId, format: i32) -> Result<()>;

    /// Restrict capture to a sub-rectangle of the sensor.
    fn set_roi(&mut self, id: DeviceId, roi: &Roi) -> Result<()>;

    /// Expose the sensor and commit one frame into the bound buffer.
    /// Blocks until the driver reports a result.
    fn freeze(&mut self, id: DeviceId) -> DriverCode;

    /// Persist the bound buffer as a JPEG file at `request.path`.
    fn save_image(&mut self, id: DeviceId, request: &SaveRequest<'_>) -> DriverCode;

    /// Close the camera. Buffer memory is reclaimed as a side effect;
    /// there is nothing to recover if this fails, so it cannot.
    fn close(&mut self, id: DeviceId);
}
