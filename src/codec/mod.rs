//! Bridge between the driver's save-to-file operation and in-memory bytes.

use crate::driver::{
    CameraDriver, DeviceId, DriverCode, SaveRequest, CODE_CORRUPT_SOURCE, CODE_FILE_OPEN_ERROR,
    CODE_INVALID_PARAMETER, CODE_NOT_SUPPORTED, CODE_NO_SUCCESS, CODE_SUCCESS,
};
use crate::errors::{CameraError, Result};
use std::fs;

/// Classified outcome of the driver's save operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Success,
    InvalidParameter,
    CorruptSourceFormat,
    FileOpenFailed,
    Failed,
    NotSupported,
    Unknown(DriverCode),
}

impl SaveStatus {
    pub fn classify(code: DriverCode) -> Self {
        match code {
            CODE_SUCCESS => Self::Success,
            CODE_INVALID_PARAMETER => Self::InvalidParameter,
            CODE_CORRUPT_SOURCE => Self::CorruptSourceFormat,
            CODE_FILE_OPEN_ERROR => Self::FileOpenFailed,
            CODE_NO_SUCCESS => Self::Failed,
            CODE_NOT_SUPPORTED => Self::NotSupported,
            other => Self::Unknown(other),
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::CorruptSourceFormat => write!(f, "corrupt source format"),
            Self::FileOpenFailed => write!(f, "file open failed"),
            Self::Failed => write!(f, "generic failure"),
            Self::NotSupported => write!(f, "operation not supported"),
            Self::Unknown(code) => write!(f, "unknown driver code {code}"),
        }
    }
}

/// Persist the bound buffer through the driver, then read the file back.
///
/// A non-success save is logged and does not abort the exchange: whatever
/// bytes exist at the target path (possibly a stale earlier capture) are
/// still served. A file that cannot be read at all escalates, since there
/// is nothing left to serve.
pub fn save_and_load(
    driver: &mut dyn CameraDriver,
    id: DeviceId,
    request: &SaveRequest<'_>,
) -> Result<Vec<u8>> {
    let status = SaveStatus::classify(driver.save_image(id, request));
    if !status.is_success() {
        tracing::warn!(
            "Camera {}: save to {} reported {}",
            id,
            request.path.display(),
            status
        );
    }

    fs::read(request.path).map_err(|source| CameraError::ImageLoad {
        path: request.path.to_path_buf(),
        source,
    })
}
