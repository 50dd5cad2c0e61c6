use std::path::Path;

use anyhow::Context;

use crate::foundation::core::Size;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// A decoded source image held as premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pixels: image::RgbaImage,
    format: Option<image::ImageFormat>,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Container format the bytes were decoded from, when it could be sniffed.
    pub fn format(&self) -> Option<image::ImageFormat> {
        self.format
    }

    /// Premultiplied RGBA at `(x, y)`.
    pub fn premul_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub(crate) fn premul_pixels(&self) -> &image::RgbaImage {
        &self.pixels
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> KenBurnsResult<SourceImage> {
    if bytes.is_empty() {
        return Err(KenBurnsError::decode("source image is empty"));
    }
    let format = image::guess_format(bytes).ok();
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| KenBurnsError::decode(format!("decode image from memory: {e}")))?;

    let mut pixels = dyn_img.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(KenBurnsError::decode("source image has no pixels"));
    }
    premultiply_rgba8_in_place(&mut pixels);

    Ok(SourceImage { pixels, format })
}

/// Read and decode the image at `path`.
#[tracing::instrument]
pub fn load_source(path: &Path) -> KenBurnsResult<SourceImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("open source image '{}'", path.display()))?;
    let img = decode_image(&bytes)?;
    tracing::debug!(size = %img.size(), format = ?img.format(), "decoded source image");
    Ok(img)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
