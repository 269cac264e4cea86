//! Image file helpers

use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use super::types::MapFormat;
use crate::error::{DecodeError, Error, Result};

/// Quality used by [`save_image_jpeg`] when none is given by a format
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Decode tile image bytes into an RGBA raster
pub fn decode_tile_image(data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(data).map_err(DecodeError::from)?;
    Ok(img.to_rgba8())
}

/// Load an image file of any supported codec
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbaImage> {
    let data = fs::read(path)?;
    decode_tile_image(&data)
}

/// Encode a raster in the codec matching `format`.
///
/// `pngraw` carries elevation data and is not produced locally.
pub fn encode_image(image: &RgbaImage, format: MapFormat) -> Result<Vec<u8>> {
    if format == MapFormat::PngRaw {
        return Err(Error::Configuration(format!(
            "cannot encode {} images",
            format
        )));
    }

    match format.jpeg_quality() {
        Some(quality) => encode_jpeg(image, quality),
        None => encode_png(image),
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(DecodeError::from)?;
    Ok(buf)
}

fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(DecodeError::from)?;
    Ok(buf)
}

/// Write a raster to a PNG file
pub fn save_image_png(image: &RgbaImage, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, encode_png(image)?)?;
    Ok(())
}

/// Write a raster to a JPEG file
pub fn save_image_jpeg(image: &RgbaImage, path: impl AsRef<Path>, quality: u8) -> Result<()> {
    fs::write(path, encode_jpeg(image, quality)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checkerboard() -> RgbaImage {
        RgbaImage::from_fn(32, 16, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgba([250, 20, 20, 255])
            } else {
                Rgba([10, 10, 240, 128])
            }
        })
    }

    #[test]
    fn test_png_is_lossless() {
        let image = checkerboard();
        for format in [MapFormat::Png, MapFormat::Png64] {
            let bytes = encode_image(&image, format).unwrap();
            assert_eq!(decode_tile_image(&bytes).unwrap(), image);
        }
    }

    #[test]
    fn test_jpeg_keeps_dimensions() {
        let bytes = encode_image(&checkerboard(), MapFormat::Jpg80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = decode_tile_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_pngraw_not_encodable() {
        assert!(matches!(
            encode_image(&checkerboard(), MapFormat::PngRaw),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let image = checkerboard();

        let png = dir.path().join("tile.png");
        save_image_png(&image, &png).unwrap();
        assert_eq!(load_image(&png).unwrap(), image);

        let jpg = dir.path().join("tile.jpg");
        save_image_jpeg(&image, &jpg, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(load_image(&jpg).unwrap().dimensions(), image.dimensions());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_tile_image(b"not an image"),
            Err(Error::Decode(DecodeError::Image(_)))
        ));
        assert!(matches!(
            load_image("/nonexistent/tile.png"),
            Err(Error::Io(_))
        ));
    }
}
