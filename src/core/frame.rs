//! Raw and encoded frame types

use bytes::Bytes;

use crate::error::CaptureError;

/// A raw RGB8 frame as produced by a frame source.
///
/// The pixel buffer is tightly packed row-major RGB, `width * height * 3`
/// bytes. Frames are ephemeral: the camera owns one until it is encoded,
/// the server materializes one per request and drops it with the reply.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Packed RGB8 pixel data
    pub pixels: Bytes,
}

impl Frame {
    /// Expected pixel buffer length for the given dimensions
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Create a frame, validating that the buffer matches the dimensions
    pub fn new(width: u32, height: u32, pixels: Bytes) -> Result<Self, CaptureError> {
        if pixels.len() != Self::byte_len(width, height) {
            return Err(CaptureError::InvalidFrame(format!(
                "pixel buffer is {} bytes, expected {} for {}x{}",
                pixels.len(),
                Self::byte_len(width, height),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// A JPEG-compressed frame ready for one transport send.
///
/// Created once per capture and consumed by exactly one round trip. The
/// request-reply session never holds more than one of these in flight.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// JPEG bytes
    pub jpeg: Bytes,
    /// Quality the encoder was configured with (0-100)
    pub quality: u8,
}

impl EncodedFrame {
    /// Size of the compressed payload in bytes
    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    /// Whether the payload is empty (never true for a valid encode)
    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}
