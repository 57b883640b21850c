//! Scripted driver for testing the capture core without hardware.

use super::{
    BufferSpec, BufferToken, CameraDriver, DeviceId, DriverCode, Roi, SaveRequest, CODE_SUCCESS,
};
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::rc::Rc;

/// What the mock should do when asked to save the bound buffer.
#[derive(Debug, Clone)]
pub enum SaveScript {
    /// Report the code and write `payload` to the target path.
    Write { code: DriverCode, payload: Vec<u8> },
    /// Report the code without touching the filesystem.
    Skip { code: DriverCode },
}

/// Driver calls recorded in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(DeviceId),
    AllocBuffer(DeviceId),
    BindBuffer(DeviceId, BufferToken),
    SetColorFormat(DeviceId, i32),
    SetRoi(DeviceId),
    Freeze(DeviceId),
    SaveImage(DeviceId),
    Close(DeviceId),
}

/// Shared recording of every driver call, cloneable before the driver is
/// handed to a scheduler so tests can inspect it afterwards.
pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Mock driver with per-device scripts for freeze and save outcomes.
///
/// Unscripted freezes succeed and unscripted saves write a deterministic
/// per-device payload, so most tests only script the failure they study.
#[derive(Debug)]
pub struct MockDriver {
    device_count: usize,
    freeze_scripts: HashMap<DeviceId, VecDeque<DriverCode>>,
    save_scripts: HashMap<DeviceId, VecDeque<SaveScript>>,
    open_failures: HashMap<DeviceId, String>,
    next_token: u32,
    calls: CallLog,
}

impl MockDriver {
    pub fn new(device_count: usize) -> Self {
        Self {
            device_count,
            freeze_scripts: HashMap::new(),
            save_scripts: HashMap::new(),
            open_failures: HashMap::new(),
            next_token: 1,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Handle to the call log; survives the driver being moved or dropped.
    pub fn call_log(&self) -> CallLog {
        Rc::clone(&self.calls)
    }

    /// Queue freeze result codes for a device; once drained, freezes succeed.
    pub fn script_freeze(&mut self, id: DeviceId, codes: &[DriverCode]) {
        self.freeze_scripts.entry(id).or_default().extend(codes);
    }

    /// Queue save behaviors for a device; once drained, saves write the
    /// default payload and report success.
    pub fn script_save(&mut self, id: DeviceId, scripts: Vec<SaveScript>) {
        self.save_scripts.entry(id).or_default().extend(scripts);
    }

    /// Make `open` fail for a device with the given reason.
    pub fn fail_open(&mut self, id: DeviceId, reason: &str) {
        self.open_failures.insert(id, reason.to_owned());
    }

    /// Deterministic JPEG-like payload the mock writes by default.
    pub fn default_payload(id: DeviceId, sequence: u64) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(format!("mock-{}-{}", id, sequence).as_bytes());
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    pub fn freezes_for(&self, id: DeviceId) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| **c == Call::Freeze(id))
            .count()
    }

    fn save_count(&self, id: DeviceId) -> u64 {
        self.calls
            .borrow()
            .iter()
            .filter(|c| **c == Call::SaveImage(id))
            .count() as u64
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl CameraDriver for MockDriver {
    fn device_count(&mut self) -> Result<usize> {
        Ok(self.device_count)
    }

    fn open(&mut self, id: DeviceId) -> Result<()> {
        self.record(Call::Open(id));
        if let Some(reason) = self.open_failures.get(&id) {
            return Err(anyhow!("{reason}"));
        }
        Ok(())
    }

    fn alloc_buffer(&mut self, id: DeviceId, _spec: &BufferSpec) -> Result<BufferToken> {
        self.record(Call::AllocBuffer(id));
        let token = BufferToken(self.next_token);
        self.next_token += 1;
        Ok(token)
    }

    fn bind_buffer(&mut self, id: DeviceId, buffer: BufferToken) -> Result<()> {
        self.record(Call::BindBuffer(id, buffer));
        Ok(())
    }

    fn set_color_format(&mut self, id: DeviceId, format: i32) -> Result<()> {
        self.record(Call::SetColorFormat(id, format));
        Ok(())
    }

    fn set_roi(&mut self, id: DeviceId, _roi: &Roi) -> Result<()> {
        self.record(Call::SetRoi(id));
        Ok(())
    }

    fn freeze(&mut self, id: DeviceId) -> DriverCode {
        self.record(Call::Freeze(id));
        self.freeze_scripts
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(CODE_SUCCESS)
    }

    fn save_image(&mut self, id: DeviceId, request: &SaveRequest<'_>) -> DriverCode {
        // Sequence for the default payload, counted before this call is
        // recorded so the first save for a device is sequence 0.
        let sequence = self.save_count(id);
        self.record(Call::SaveImage(id));

        let script = self
            .save_scripts
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(SaveScript::Write {
                code: CODE_SUCCESS,
                payload: Self::default_payload(id, sequence),
            });

        match script {
            SaveScript::Write { code, payload } => {
                if fs::write(request.path, payload).is_err() {
                    return super::CODE_FILE_OPEN_ERROR;
                }
                code
            }
            SaveScript::Skip { code } => code,
        }
    }

    fn close(&mut self, id: DeviceId) {
        self.record(Call::Close(id));
    }
}
