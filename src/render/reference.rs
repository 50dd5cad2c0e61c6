use std::sync::Arc;

use crate::assets::decode::SourceImage;
use crate::foundation::core::Size;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// The oversampled base image every frame is cropped from.
///
/// Cloning is cheap; all clones share the same read-only pixels.
#[derive(Clone, Debug)]
pub struct ReferenceImage {
    pixels: Arc<image::RgbaImage>,
}

impl ReferenceImage {
    /// Wrap premultiplied RGBA8 pixels that are already at reference resolution.
    pub fn from_premul_pixels(pixels: image::RgbaImage) -> KenBurnsResult<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(KenBurnsError::configuration(
                "reference image must be non-empty",
            ));
        }
        Ok(Self {
            pixels: Arc::new(pixels),
        })
    }

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

    pub(crate) fn premul_pixels(&self) -> &image::RgbaImage {
        &self.pixels
    }
}

/// Resample `source` to exactly `reference` with a Catmull-Rom filter.
///
/// This is the only high-quality resample of a run; per-frame crops are taken from its output.
#[tracing::instrument(skip(source), fields(source = %source.size()))]
pub fn build_reference(source: &SourceImage, reference: Size) -> KenBurnsResult<ReferenceImage> {
    if reference.width == 0 || reference.height == 0 {
        return Err(KenBurnsError::configuration(format!(
            "reference size must be non-zero, got {reference}"
        )));
    }
    reference.rgba8_len()?;

    let started = std::time::Instant::now();
    let pixels = image::imageops::resize(
        source.premul_pixels(),
        reference.width,
        reference.height,
        image::imageops::FilterType::CatmullRom,
    );
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "built reference image"
    );
    ReferenceImage::from_premul_pixels(pixels)
}

#[cfg(test)]
#[path = "../../tests/unit/render/reference.rs"]
mod tests;
