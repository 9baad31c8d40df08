//! Error kinds for the frame pipeline
//!
//! Every kind maps to a loop-level recovery policy: capture and encode
//! failures skip the frame, transport failures back off and redial,
//! classifier failures downgrade the frame to an OK verdict. None of them
//! terminate a role loop.

use std::time::Duration;

use thiserror::Error;

/// Frame source failed to produce a frame
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The source will not produce any more frames
    #[error("frame source closed")]
    SourceClosed,
    /// The camera process could not be started or died
    #[error("camera failed: {0}")]
    Camera(String),
    /// The source produced data that is not a usable frame
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

/// JPEG compression or decompression failed
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("jpeg encode failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("jpeg decode failed: {0}")]
    Decode(#[source] image::ImageError),
    #[error("frame geometry mismatch: {width}x{height} with {bytes} pixel bytes")]
    Geometry { width: u32, height: u32, bytes: usize },
}

/// The round trip to the peer failed
#[derive(Debug, Error)]
pub enum TransportError {
    /// No verdict arrived within the configured bound
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// Connection-level failure
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    /// The peer sent something outside the wire contract
    #[error("protocol error: {0}")]
    Protocol(String),
    /// No session established yet
    #[error("not connected")]
    NotConnected,
}

/// The classifier failed on a frame; the frame is treated as clean
#[derive(Debug, Error)]
#[error("classifier failed: {0}")]
pub struct InferenceError(pub String);
