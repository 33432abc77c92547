//! Decoded texture pixels.

use crate::error::{Error, Result};

/// Bytes per RGBA8 texel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Tightly packed RGBA8 pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Decode an encoded image file (PNG, JPEG, ...) to RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(width, height, rgba.into_raw())
    }

    /// Wrap already decoded RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidData(format!(
                "Empty image ({width}x{height})"
            )));
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(Error::InvalidData(format!(
                "Expected {expected} bytes for {width}x{height} RGBA8, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Length of one tightly packed row in bytes.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Pixel bytes of row `r`.
    pub fn row(&self, r: u32) -> &[u8] {
        let start = r as usize * self.row_bytes();
        &self.pixels[start..start + self.row_bytes()]
    }

    /// All pixel bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn decodes_png_to_rgba8() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(3, 2, |x, y| Rgba([x as u8, y as u8, 0xAA, 0xFF]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let decoded = DecodedImage::decode(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.row_bytes(), 12);
        assert_eq!(decoded.row(1), &[0, 1, 0xAA, 0xFF, 1, 1, 0xAA, 0xFF, 2, 1, 0xAA, 0xFF]);
    }

    #[test]
    fn rejects_mismatched_length() {
        assert!(DecodedImage::from_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(DecodedImage::from_rgba8(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            DecodedImage::decode(b"not an image"),
            Err(Error::Decode(_))
        ));
    }
}
