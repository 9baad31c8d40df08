//! Frame acquisition
//!
//! Sources behind the [`FrameSource`] trait:
//! - Pi camera via `rpicam-vid` MJPEG output
//! - a synthetic test pattern for development without hardware

pub mod camera;
pub mod mjpeg;
pub mod synthetic;

use crate::core::Frame;
use crate::error::CaptureError;

pub use camera::{CameraConfig, CameraSource};
pub use synthetic::SyntheticSource;

/// Frame source collaborator: produces one raw frame per call.
///
/// Must tolerate being called at the stream loop's cadence. Resource
/// release happens in `Drop`, so the camera is let go on every exit path.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Capture the next frame
    async fn capture(&mut self) -> Result<Frame, CaptureError>;
}

#[async_trait::async_trait]
impl FrameSource for Box<dyn FrameSource> {
    async fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture().await
    }
}
