//! Synthetic frame source
//!
//! Deterministic test pattern used when no camera is available: a color
//! gradient with a white block that walks across the frame, and the frame
//! counter folded into the blue channel so consecutive frames differ.
//! Always compiled in; the camera binary falls back to it at runtime.

use bytes::Bytes;

use crate::capture::FrameSource;
use crate::core::Frame;
use crate::error::CaptureError;

/// Side length of the moving block
const BLOCK_SIZE: u32 = 64;

/// Generates an endless stream of test-pattern frames.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    counter: u64,
}

impl SyntheticSource {
    /// Create a source producing frames of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            counter: 0,
        }
    }

    fn render(&self) -> Bytes {
        let (w, h) = (self.width, self.height);
        let mut pixels = Vec::with_capacity(Frame::byte_len(w, h));

        let block = BLOCK_SIZE.min(w).min(h);
        let span = (w - block).max(1) as u64;
        let block_x = ((self.counter * 8) % span) as u32;
        let block_y = (h.saturating_sub(block)) / 2;

        for y in 0..h {
            for x in 0..w {
                let in_block = x >= block_x
                    && x < block_x + block
                    && y >= block_y
                    && y < block_y + block;
                if in_block {
                    pixels.extend_from_slice(&[255, 255, 255]);
                } else {
                    pixels.push((x * 255 / w.max(1)) as u8);
                    pixels.push((y * 255 / h.max(1)) as u8);
                    pixels.push((self.counter & 0xFF) as u8);
                }
            }
        }

        Bytes::from(pixels)
    }
}

#[async_trait::async_trait]
impl FrameSource for SyntheticSource {
    async fn capture(&mut self) -> Result<Frame, CaptureError> {
        let frame = Frame::new(self.width, self.height, self.render())?;
        self.counter = self.counter.wrapping_add(1);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_have_expected_geometry() {
        let mut source = SyntheticSource::new(320, 240);
        let frame = source.capture().await.unwrap();
        assert_eq!(frame.width, 320);
        assert_eq!(frame.height, 240);
        assert_eq!(frame.pixels.len(), Frame::byte_len(320, 240));
    }

    #[tokio::test]
    async fn test_consecutive_frames_differ() {
        let mut source = SyntheticSource::new(160, 120);
        let a = source.capture().await.unwrap();
        let b = source.capture().await.unwrap();
        assert_ne!(a.pixels, b.pixels);
    }
}
