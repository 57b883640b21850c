use super::CaptureConfig;
use crate::driver::{BufferToken, CameraDriver, DeviceId};
use crate::errors::{CameraError, Result};

/// Fixed device id of the left camera.
pub const LEFT_DEVICE_ID: DeviceId = DeviceId(1);
/// Fixed device id of the right camera.
pub const RIGHT_DEVICE_ID: DeviceId = DeviceId(2);

/// Owned binding to one physical camera and its allocated frame buffer.
///
/// A handle is neither `Clone` nor `Copy`: exactly one handle exists per
/// device id, and the buffer it holds is released exactly once, through
/// [`DeviceHandle::release`], on every scheduler exit path.
#[derive(Debug)]
pub struct DeviceHandle {
    id: DeviceId,
    buffer: Option<BufferToken>,
    acquired: bool,
}

impl DeviceHandle {
    pub(super) fn new(id: DeviceId) -> Self {
        Self {
            id,
            buffer: None,
            acquired: false,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Buffer token bound to this device, once acquired.
    pub fn buffer(&self) -> Option<BufferToken> {
        self.buffer
    }

    /// Open the camera, allocate and bind its frame buffer, and configure
    /// the color format and, if requested, the region of interest.
    pub(super) fn acquire(
        &mut self,
        driver: &mut dyn CameraDriver,
        config: &CaptureConfig,
    ) -> Result<()> {
        driver.open(self.id).map_err(|err| CameraError::DeviceInit {
            id: self.id,
            reason: format!("{err:#}"),
        })?;
        self.acquired = true;

        let config_err = |err: anyhow::Error| CameraError::DeviceConfig {
            id: self.id,
            reason: format!("{err:#}"),
        };

        let buffer = driver.alloc_buffer(self.id, &config.buffer).map_err(config_err)?;
        self.buffer = Some(buffer);

        driver.bind_buffer(self.id, buffer).map_err(config_err)?;
        driver
            .set_color_format(self.id, config.color_format)
            .map_err(config_err)?;

        if let Some(roi) = &config.roi {
            driver.set_roi(self.id, roi).map_err(config_err)?;
        }

        Ok(())
    }

    /// Close the camera. Buffer memory is reclaimed by the close itself;
    /// failures are not surfaced because no recovery action exists.
    pub(super) fn release(&mut self, driver: &mut dyn CameraDriver) {
        if !self.acquired {
            return;
        }
        driver.close(self.id);
        self.buffer = None;
        self.acquired = false;
    }
}
