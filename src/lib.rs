//! Alternating dual-camera still capture served over a request/reply socket.
//!
//! The vendor camera stack is abstracted behind [`driver::CameraDriver`], so
//! the capture scheduler and the serving loop can be exercised against a
//! scripted driver without hardware.

pub mod capture;
pub mod codec;
pub mod driver;
pub mod errors;
pub mod server;

pub use capture::{CaptureConfig, CaptureScheduler, CapturedImage, RetryPolicy};
pub use driver::{CameraDriver, DeviceId, NokhwaDriver};
pub use errors::CameraError;
pub use server::{ImageServer, ReplyFormat, ReplySocket};
