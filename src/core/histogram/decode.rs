//! Pixel decoding with format-specific fast paths.
//!
//! Uses zune-jpeg for JPEG data (1.5-2x faster than image crate),
//! falls back to image crate for everything else.

use crate::error::HistogramError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Decode an image file into a fully materialized pixel surface.
pub fn decode_file(path: &Path) -> Result<DynamicImage, HistogramError> {
    let bytes = fs::read(path)
        .map_err(|e| HistogramError::decode(path.display().to_string(), e.to_string()))?;
    decode_bytes(&bytes, &path.display().to_string())
}

/// Decode in-memory image data. `source_name` is only used in error messages.
pub fn decode_bytes(bytes: &[u8], source_name: &str) -> Result<DynamicImage, HistogramError> {
    if bytes.is_empty() {
        return Err(HistogramError::decode(source_name, "no image data"));
    }

    if bytes.starts_with(&JPEG_MAGIC) {
        if let Ok(image) = decode_jpeg(bytes, source_name) {
            return Ok(image);
        }
    }

    image::load_from_memory(bytes).map_err(|e| HistogramError::decode(source_name, e.to_string()))
}

/// Fast JPEG decoding using zune-jpeg
fn decode_jpeg(bytes: &[u8], source_name: &str) -> Result<DynamicImage, HistogramError> {
    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);

    let pixels = decoder
        .decode()
        .map_err(|e| HistogramError::decode(source_name, format!("zune-jpeg decode failed: {e:?}")))?;

    let info = decoder
        .info()
        .ok_or_else(|| HistogramError::decode(source_name, "missing image info"))?;
    let width = info.width as u32;
    let height = info.height as u32;

    let incomplete = || HistogramError::decode(source_name, "pixel buffer is incomplete");

    match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
        ColorSpace::RGB => {
            let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels).ok_or_else(incomplete)?;
            Ok(DynamicImage::ImageRgb8(buffer))
        }
        ColorSpace::RGBA => {
            let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels).ok_or_else(incomplete)?;
            Ok(DynamicImage::ImageRgba8(buffer))
        }
        ColorSpace::Luma => {
            let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels).ok_or_else(incomplete)?;
            Ok(DynamicImage::ImageLuma8(buffer))
        }
        other => Err(HistogramError::decode(
            source_name,
            format!("unsupported colorspace {other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_png_bytes() {
        let image = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let decoded = decode_bytes(&encode(&image, ImageFormat::Png), "mem.png").unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
    }

    #[test]
    fn decodes_jpeg_bytes() {
        let image = RgbImage::from_pixel(16, 16, Rgb([200, 40, 40]));
        let decoded = decode_bytes(&encode(&image, ImageFormat::Jpeg), "mem.jpg").unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn truncated_data_is_a_decode_error() {
        let image = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let bytes = encode(&image, ImageFormat::Png);
        let result = decode_bytes(&bytes[..bytes.len() / 2], "half.png");
        assert!(matches!(result, Err(HistogramError::Decode { .. })));
    }

    #[test]
    fn empty_data_is_a_decode_error() {
        assert!(matches!(
            decode_bytes(&[], "empty"),
            Err(HistogramError::Decode { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let result = decode_file(Path::new("/nonexistent/photo.png"));
        assert!(matches!(result, Err(HistogramError::Decode { .. })));
    }
}
