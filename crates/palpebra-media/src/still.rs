//! Still-image handling: the reference face image and the intermediate
//! JPEG artifacts the pipeline leaves behind.

use crate::MediaError;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, ImageReader, Rgb};
use palpebra_core::Frame;
use std::path::Path;

/// Load a still image as an RGB frame (index 0).
pub fn load_frame(path: &Path) -> Result<Frame, MediaError> {
    if !path.exists() {
        return Err(MediaError::NotFound(path.display().to_string()));
    }
    let rgb = ImageReader::open(path)?.decode()?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 0))
}

/// Encode a frame as JPEG bytes (quality 90).
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, MediaError> {
    let buffer: ImageBuffer<Rgb<u8>, _> =
        ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .expect("frame data length matches its dimensions");

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90).encode_image(&buffer)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_frame() -> Frame {
        let mut data = Vec::with_capacity(8 * 8 * 3);
        for y in 0..8u32 {
            for x in 0..8u32 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, 8, 8, 0)
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_frame(Path::new("/nonexistent/ref.png")).unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[test]
    fn test_png_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.png");

        let frame = checker_frame();
        let buffer: ImageBuffer<Rgb<u8>, _> =
            ImageBuffer::from_raw(8, 8, frame.data().to_vec()).unwrap();
        buffer.save(&path).unwrap();

        let loaded = load_frame(&path).unwrap();
        assert_eq!(loaded.width(), 8);
        assert_eq!(loaded.height(), 8);
        // PNG is lossless: bytes survive exactly.
        assert_eq!(loaded.data(), frame.data());
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let bytes = encode_jpeg(&checker_frame()).unwrap();
        assert!(bytes.len() > 2);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
