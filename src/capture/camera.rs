//! Pi camera frame source
//!
//! Spawns `rpicam-vid` in MJPEG mode and reads its stdout on a blocking
//! task, splitting the stream into individual JPEG images. `capture`
//! decodes the next image to a raw RGB frame.

use std::io::Read;
use std::process::{Child, Command, Stdio};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::mjpeg::MjpegSplitter;
use crate::capture::FrameSource;
use crate::codec::decode_jpeg;
use crate::core::Frame;
use crate::error::CaptureError;

/// Camera capture configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Sensor frame rate; the stream loop sets the effective send rate
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: crate::core::DEFAULT_FRAME_WIDTH,
            height: crate::core::DEFAULT_FRAME_HEIGHT,
            fps: 30,
        }
    }
}

/// Handle to a running camera process.
///
/// The child is killed on `Drop`, so the camera is released on every exit
/// path of the stream loop.
pub struct CameraSource {
    child: Option<Child>,
    rx: mpsc::Receiver<Bytes>,
}

impl CameraSource {
    /// Start the camera process and the stream reader
    pub fn start(config: CameraConfig) -> Result<Self, CaptureError> {
        // Capacity 1: when the stream loop falls behind the sensor, frames
        // are dropped at the reader so capture always sees a recent one.
        let (tx, rx) = mpsc::channel(1);

        let args = [
            "-t".to_string(),
            "0".to_string(), // run indefinitely
            "--codec".to_string(),
            "mjpeg".to_string(),
            "--width".to_string(),
            config.width.to_string(),
            "--height".to_string(),
            config.height.to_string(),
            "--framerate".to_string(),
            config.fps.to_string(),
            "--nopreview".to_string(),
            "-o".to_string(),
            "-".to_string(),
            "--flush".to_string(),
        ];

        info!(
            "Starting rpicam-vid: {}x{} @ {}fps (mjpeg)",
            config.width, config.height, config.fps
        );

        let mut child = Command::new("rpicam-vid")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Camera(format!("failed to spawn rpicam-vid: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Camera("no stdout from rpicam-vid".to_string()))?;

        tokio::task::spawn_blocking(move || {
            Self::read_stream(stdout, tx);
        });

        Ok(Self {
            child: Some(child),
            rx,
        })
    }

    /// Read the MJPEG stream and push complete images to the channel
    fn read_stream<R: Read>(mut reader: R, tx: mpsc::Sender<Bytes>) {
        let mut splitter = MjpegSplitter::new();
        let mut buf = vec![0u8; 64 * 1024];
        let mut image_count = 0u64;

        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    info!("Camera stream ended (EOF)");
                    break;
                }
                Ok(n) => {
                    for image in splitter.feed(&buf[..n]) {
                        image_count += 1;
                        if image_count % 300 == 0 {
                            debug!("Camera: {} images read", image_count);
                        }
                        match tx.try_send(image) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                // Consumer is mid round trip; drop the frame
                                // rather than queueing stale ones.
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                info!("Frame receiver dropped, stopping camera reader");
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Error reading camera stream: {e}");
                    break;
                }
            }
        }
    }

    /// Stop the camera process
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!("Stopping camera");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait::async_trait]
impl FrameSource for CameraSource {
    async fn capture(&mut self) -> Result<Frame, CaptureError> {
        let jpeg = self.rx.recv().await.ok_or(CaptureError::SourceClosed)?;
        decode_jpeg(&jpeg).map_err(|e| CaptureError::InvalidFrame(e.to_string()))
    }
}
