//! JPEG compression of raw frames
//!
//! The wire carries lossy-compressed frames; quality is set once on the
//! camera side. Decode normalizes any channel layout back to RGB8.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};

use crate::core::{EncodedFrame, Frame};
use crate::error::EncodeError;

/// Compress a raw frame to JPEG at the given quality (0-100)
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<EncodedFrame, EncodeError> {
    if frame.pixels.len() != Frame::byte_len(frame.width, frame.height) {
        return Err(EncodeError::Geometry {
            width: frame.width,
            height: frame.height,
            bytes: frame.pixels.len(),
        });
    }

    let mut out = Vec::with_capacity(frame.pixels.len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(EncodeError::Encode)?;

    Ok(EncodedFrame {
        jpeg: Bytes::from(out),
        quality,
    })
}

/// Decode a JPEG payload back to a raw RGB8 frame.
///
/// Four-channel or grayscale input collapses to RGB so the classifier
/// always sees the same layout.
pub fn decode_jpeg(jpeg: &[u8]) -> Result<Frame, EncodeError> {
    let decoded = image::load_from_memory(jpeg).map_err(EncodeError::Decode)?;
    let rgb: RgbImage = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame {
        width,
        height,
        pixels: Bytes::from(rgb.into_raw()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::with_capacity(Frame::byte_len(width, height));
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width.max(1)) as u8);
                pixels.push((y * 255 / height.max(1)) as u8);
                pixels.push(128);
            }
        }
        Frame {
            width,
            height,
            pixels: Bytes::from(pixels),
        }
    }

    #[test]
    fn test_encode_decode_preserves_geometry() {
        let frame = gradient_frame(64, 48);
        let encoded = encode_jpeg(&frame, 85).unwrap();
        assert!(!encoded.is_empty());

        let decoded = decode_jpeg(&encoded.jpeg).unwrap();
        assert_eq!(decoded.width, 64);
        assert_eq!(decoded.height, 48);
        assert_eq!(decoded.pixels.len(), Frame::byte_len(64, 48));
    }

    #[test]
    fn test_quality_affects_size() {
        let frame = gradient_frame(128, 96);
        let high = encode_jpeg(&frame, 95).unwrap();
        let low = encode_jpeg(&frame, 20).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_encode_rejects_bad_geometry() {
        let frame = Frame {
            width: 64,
            height: 48,
            pixels: Bytes::from(vec![0u8; 10]),
        };
        assert!(matches!(
            encode_jpeg(&frame, 85),
            Err(EncodeError::Geometry { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_jpeg(b"not a jpeg"),
            Err(EncodeError::Decode(_))
        ));
    }
}
