use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

pub const DEFAULT_QUALITY: f64 = 0.92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unsupported image format '{}'", other)),
        }
    }
}

/// Map a `0..=1` quality onto the encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f64) -> u8 {
    let q = if quality.is_finite() { quality } else { DEFAULT_QUALITY };
    (q.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Composite any transparency onto a white page background.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

pub fn encode_jpeg(image: &RgbImage, quality: f64) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality));
        encoder.encode_image(image)?;
    }
    Ok(buf)
}

/// Encode the rendered report as a standalone image file.
pub fn export_image(
    bitmap: &DynamicImage,
    format: ImageFormat,
    quality: f64,
) -> Result<Vec<u8>, ExportError> {
    if bitmap.width() == 0 || bitmap.height() == 0 {
        return Err(ExportError::EmptyBitmap);
    }
    let flat = flatten_on_white(bitmap);
    match format {
        ImageFormat::Jpeg => encode_jpeg(&flat, quality),
        ImageFormat::Png => {
            let mut cursor = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(flat).write_to(&mut cursor, image::ImageFormat::Png)?;
            Ok(cursor.into_inner())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn transparent(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0])))
    }

    #[test]
    fn test_quality_mapping() {
        assert_eq!(jpeg_quality(0.92), 92);
        assert_eq!(jpeg_quality(1.5), 100);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(f64::NAN), 92);
    }

    #[test]
    fn test_flatten_transparent_is_white() {
        let flat = flatten_on_white(&transparent(2, 2));
        assert!(flat.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_flatten_keeps_opaque_pixels() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255])));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_png_signature() {
        let bytes = export_image(&transparent(4, 3), ImageFormat::Png, DEFAULT_QUALITY).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_jpeg_signature() {
        let bytes = export_image(&transparent(8, 8), ImageFormat::Jpeg, 0.5).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_empty_bitmap_rejected() {
        let err = export_image(&transparent(0, 0), ImageFormat::Png, DEFAULT_QUALITY);
        assert!(matches!(err, Err(ExportError::EmptyBitmap)));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JPG".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
