//! MJPEG stream splitting
//!
//! `rpicam-vid --codec mjpeg` writes back-to-back JPEG images to stdout.
//! This module splits that byte stream into individual images by scanning
//! for the SOI (`FF D8 FF`) and EOI (`FF D9`) markers.

use bytes::{Bytes, BytesMut};

/// Maximum splitter buffer size (8 MB) to prevent unbounded memory growth
const MAX_MJPEG_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Start-of-image marker plus the first byte of the following segment
/// marker, which cuts down false positives inside entropy-coded data.
const SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// End-of-image marker
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Incremental splitter for a concatenated-JPEG byte stream.
pub struct MjpegSplitter {
    buffer: BytesMut,
}

impl MjpegSplitter {
    /// Create a new splitter
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feed raw stream data and extract any complete images
    pub fn feed(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_MJPEG_BUFFER_SIZE {
            tracing::warn!(
                "MJPEG buffer exceeded {} bytes, resetting",
                MAX_MJPEG_BUFFER_SIZE
            );
            self.buffer.clear();
            return Vec::new();
        }
        self.extract_images()
    }

    fn extract_images(&mut self) -> Vec<Bytes> {
        let mut images = Vec::new();

        loop {
            let Some(soi) = find(&self.buffer, &SOI) else {
                // No image start in sight; keep a tail that could be a
                // partial marker and drop the rest.
                let keep = SOI.len() - 1;
                if self.buffer.len() > keep {
                    let tail_start = self.buffer.len() - keep;
                    let _ = self.buffer.split_to(tail_start);
                }
                break;
            };

            // Drop garbage before the image start
            if soi > 0 {
                let _ = self.buffer.split_to(soi);
            }

            let Some(eoi) = find_from(&self.buffer, SOI.len(), &EOI) else {
                break; // image still incomplete
            };

            images.push(self.buffer.split_to(eoi + EOI.len()).freeze());
        }

        images
    }
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    find_from(haystack, 0, needle)
}

fn find_from(haystack: &[u8], offset: usize, needle: &[u8]) -> Option<usize> {
    if haystack.len() < offset + needle.len() {
        return None;
    }
    haystack[offset..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jpeg(body: &[u8]) -> Vec<u8> {
        let mut img = vec![0xFF, 0xD8, 0xFF, 0xE0];
        img.extend_from_slice(body);
        img.extend_from_slice(&EOI);
        img
    }

    #[test]
    fn test_single_image_in_one_feed() {
        let img = fake_jpeg(b"pixels");
        let mut splitter = MjpegSplitter::new();
        let out = splitter.feed(&img);
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0][..], &img[..]);
    }

    #[test]
    fn test_image_split_across_chunks() {
        let img = fake_jpeg(b"a longer body of compressed data");
        let mut splitter = MjpegSplitter::new();
        let (a, b) = img.split_at(7);
        assert!(splitter.feed(a).is_empty());
        let out = splitter.feed(b);
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0][..], &img[..]);
    }

    #[test]
    fn test_two_images_in_one_feed() {
        let first = fake_jpeg(b"one");
        let second = fake_jpeg(b"two");
        let mut stream = first.clone();
        stream.extend_from_slice(&second);

        let mut splitter = MjpegSplitter::new();
        let out = splitter.feed(&stream);
        assert_eq!(out.len(), 2);
        assert_eq!(&out[0][..], &first[..]);
        assert_eq!(&out[1][..], &second[..]);
    }

    #[test]
    fn test_garbage_before_image_is_dropped() {
        let img = fake_jpeg(b"pixels");
        let mut stream = b"noise noise".to_vec();
        stream.extend_from_slice(&img);

        let mut splitter = MjpegSplitter::new();
        let out = splitter.feed(&stream);
        assert_eq!(out.len(), 1);
        assert_eq!(&out[0][..], &img[..]);
    }
}
