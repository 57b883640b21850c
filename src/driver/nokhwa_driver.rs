use super::{
    BufferSpec, BufferToken, CameraDriver, DeviceId, DriverCode, Roi, SaveRequest, CODE_FILE_OPEN_ERROR,
    CODE_INVALID_PARAMETER, CODE_NO_SUCCESS, CODE_SUCCESS,
};
use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;

struct OpenCamera {
    camera: Camera,
    buffers: HashMap<BufferToken, Vec<u8>>,
    bound: Option<BufferToken>,
    roi: Option<Roi>,
    last_frame: Option<RgbImage>,
}

/// Production driver backend on top of nokhwa.
///
/// Device ids are the fixed 1-based camera ids of the capture rig;
/// nokhwa enumerates 0-based, so id N maps to camera index N-1.
pub struct NokhwaDriver {
    cameras: HashMap<DeviceId, OpenCamera>,
    next_token: u32,
}

impl NokhwaDriver {
    pub fn new() -> Self {
        Self {
            cameras: HashMap::new(),
            next_token: 1,
        }
    }

    fn opened(&mut self, id: DeviceId) -> Result<&mut OpenCamera> {
        self.cameras
            .get_mut(&id)
            .ok_or_else(|| anyhow!("camera {} is not open", id))
    }
}

impl Default for NokhwaDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for NokhwaDriver {
    fn device_count(&mut self) -> Result<usize> {
        let devices = nokhwa::query(ApiBackend::Auto).context("Failed to enumerate cameras")?;
        Ok(devices.len())
    }

    fn open(&mut self, id: DeviceId) -> Result<()> {
        tracing::info!("Opening camera {}", id);

        let index = CameraIndex::Index(id.0.saturating_sub(1));
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        // The stream is torn down with the Camera value, so abrupt device
        // removal releases driver resources along with this handle.
        camera.open_stream().context("Failed to open camera stream")?;

        self.cameras.insert(
            id,
            OpenCamera {
                camera,
                buffers: HashMap::new(),
                bound: None,
                roi: None,
                last_frame: None,
            },
        );

        tracing::info!("Camera {} opened", id);
        Ok(())
    }

    fn alloc_buffer(&mut self, id: DeviceId, spec: &BufferSpec) -> Result<BufferToken> {
        let token = BufferToken(self.next_token);
        self.next_token += 1;

        let size = (spec.width * spec.height * spec.bits_per_pixel / 8) as usize;
        let cam = self.opened(id)?;
        cam.buffers.insert(token, vec![0u8; size]);

        Ok(token)
    }

    fn bind_buffer(&mut self, id: DeviceId, buffer: BufferToken) -> Result<()> {
        let cam = self.opened(id)?;
        if !cam.buffers.contains_key(&buffer) {
            return Err(anyhow!("buffer {:?} was not allocated on camera {}", buffer, id));
        }
        cam.bound = Some(buffer);
        Ok(())
    }

    fn set_color_format(&mut self, id: DeviceId, format: i32) -> Result<()> {
        // nokhwa decodes to RGB regardless of the sensor format; the
        // vendor-specific format code has no equivalent here.
        self.opened(id)?;
        tracing::debug!("Camera {}: color format code {} accepted", id, format);
        Ok(())
    }

    fn set_roi(&mut self, id: DeviceId, roi: &Roi) -> Result<()> {
        let cam = self.opened(id)?;
        cam.roi = Some(*roi);
        Ok(())
    }

    fn freeze(&mut self, id: DeviceId) -> DriverCode {
        let cam = match self.opened(id) {
            Ok(cam) => cam,
            Err(_) => return CODE_INVALID_PARAMETER,
        };

        let frame = match cam.camera.frame() {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!("Camera {}: frame grab failed: {}", id, err);
                return CODE_NO_SUCCESS;
            }
        };

        let mut decoded = match frame.decode_image::<RgbFormat>() {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!("Camera {}: frame decode failed: {}", id, err);
                return CODE_NO_SUCCESS;
            }
        };

        if let Some(roi) = cam.roi {
            decoded =
                image::imageops::crop_imm(&decoded, roi.x, roi.y, roi.width, roi.height).to_image();
        }

        // Commit the raw pixels into the bound buffer, truncating if the
        // decoded frame is larger than the allocation.
        if let Some(token) = cam.bound {
            if let Some(buffer) = cam.buffers.get_mut(&token) {
                let raw = decoded.as_raw();
                let n = raw.len().min(buffer.len());
                buffer[..n].copy_from_slice(&raw[..n]);
            }
        }

        cam.last_frame = Some(decoded);
        CODE_SUCCESS
    }

    fn save_image(&mut self, id: DeviceId, request: &SaveRequest<'_>) -> DriverCode {
        let cam = match self.opened(id) {
            Ok(cam) => cam,
            Err(_) => return CODE_INVALID_PARAMETER,
        };

        if cam.bound != Some(request.buffer) {
            return CODE_INVALID_PARAMETER;
        }

        let frame = match cam.last_frame.as_ref() {
            Some(frame) => frame,
            None => return CODE_INVALID_PARAMETER,
        };

        let file = match File::create(request.path) {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!("Camera {}: could not create {}: {}", id, request.path.display(), err);
                return CODE_FILE_OPEN_ERROR;
            }
        };

        let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), request.quality);
        match encoder.encode_image(frame) {
            Ok(()) => CODE_SUCCESS,
            Err(err) => {
                tracing::debug!("Camera {}: JPEG encode failed: {}", id, err);
                CODE_NO_SUCCESS
            }
        }
    }

    fn close(&mut self, id: DeviceId) {
        // Dropping the Camera stops the stream and frees the buffers.
        self.cameras.remove(&id);
    }
}
