use super::device::{DeviceHandle, LEFT_DEVICE_ID, RIGHT_DEVICE_ID};
use super::{CaptureConfig, CapturedImage, RetryPolicy};
use crate::codec;
use crate::driver::{CameraDriver, SaveRequest, CODE_SUCCESS};
use crate::errors::{CameraError, Result};
use std::time::Instant;

/// Alternating dual-device capture scheduler.
///
/// Owns the driver, both device handles, the round-robin cursor and the
/// per-device capture counters. Single-threaded by design: all of that
/// state is mutated only by the thread driving the serving loop.
#[derive(Debug)]
pub struct CaptureScheduler<D: CameraDriver> {
    driver: D,
    devices: [DeviceHandle; 2],
    cursor: usize,
    counters: [u64; 2],
    config: CaptureConfig,
}

impl<D: CameraDriver> CaptureScheduler<D> {
    /// Acquire both cameras. Fails without opening anything if fewer than
    /// two devices are enumerable; a handle that was already acquired when
    /// a later step fails is released before the error is returned.
    pub fn initialize(mut driver: D, config: CaptureConfig) -> Result<Self> {
        let found = driver.device_count().unwrap_or_else(|err| {
            tracing::warn!("Camera enumeration failed: {err:#}");
            0
        });
        if found < 2 {
            return Err(CameraError::DeviceEnumeration { found });
        }

        let mut devices = [
            DeviceHandle::new(LEFT_DEVICE_ID),
            DeviceHandle::new(RIGHT_DEVICE_ID),
        ];
        for i in 0..devices.len() {
            if let Err(err) = devices[i].acquire(&mut driver, &config) {
                let (done, _) = devices.split_at_mut(i);
                for device in done {
                    device.release(&mut driver);
                }
                return Err(err);
            }
        }

        Ok(Self {
            driver,
            devices,
            cursor: 0,
            counters: [0, 0],
            config,
        })
    }

    /// Capture one image from the device at the cursor.
    ///
    /// The cursor advances before the freeze loop runs, so alternation is
    /// preserved whether or not the attempt succeeds. On success the image
    /// is persisted as `camera-<id>-<seq>.jpg` under the output directory
    /// and read back for transport.
    pub fn capture(&mut self) -> Result<CapturedImage> {
        let start = Instant::now();

        let slot = self.cursor;
        self.cursor = (self.cursor + 1) % self.devices.len();

        let device = &self.devices[slot];
        let id = device.id();
        let buffer = device.buffer().ok_or_else(|| CameraError::DeviceConfig {
            id,
            reason: "no frame buffer bound".to_owned(),
        })?;

        let mut attempts = 0u32;
        loop {
            self.driver
                .bind_buffer(id, buffer)
                .map_err(|err| CameraError::DeviceConfig {
                    id,
                    reason: format!("{err:#}"),
                })?;

            let code = self.driver.freeze(id);
            if code == CODE_SUCCESS {
                break;
            }
            attempts += 1;

            match self.config.retry {
                RetryPolicy::SingleAttempt => {
                    tracing::error!("Camera {} freeze failed with driver code {}", id, code);
                    return Err(CameraError::CaptureFailed { id, code });
                }
                RetryPolicy::Bounded { attempts: max } if attempts >= max => {
                    tracing::error!(
                        "Camera {} freeze failed {} times, last driver code {}",
                        id,
                        attempts,
                        code
                    );
                    return Err(CameraError::CaptureFailed { id, code });
                }
                _ => {
                    tracing::debug!("Camera {} freeze returned {}, retrying", id, code);
                }
            }
        }

        let sequence = self.counters[slot];
        self.counters[slot] += 1;

        let path = self
            .config
            .output_dir
            .join(format!("camera-{}-{}.jpg", id, sequence));

        let request = SaveRequest {
            path: &path,
            buffer,
            quality: self.config.jpeg_quality,
        };
        let bytes = codec::save_and_load(&mut self.driver, id, &request)?;

        tracing::info!(
            "Camera {}: captured in {}ms",
            id,
            start.elapsed().as_millis()
        );

        Ok(CapturedImage {
            bytes,
            device: id,
            sequence,
            path,
        })
    }

    /// Driver access for inspection; mainly useful to tests.
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: CameraDriver> Drop for CaptureScheduler<D> {
    fn drop(&mut self) {
        for device in &mut self.devices {
            device.release(&mut self.driver);
        }
    }
}
