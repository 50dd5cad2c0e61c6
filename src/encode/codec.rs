use image::ImageEncoder as _;

use crate::foundation::core::{FrameRGBA, Rgba8};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::foundation::math::{mul_div255_u16, unpremultiply_rgba8_in_place};

/// Image codec used for frame artifacts.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Png,
    Jpeg,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Map a sniffed input format onto a supported artifact codec.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// Codec contract: turn a frame into encoded bytes.
///
/// Encoders are shared by every materialization worker.
pub trait FrameEncoder: Sync {
    /// File extension (without dot) of the encoded artifacts.
    fn extension(&self) -> &str;
    fn encode(&self, frame: &FrameRGBA) -> KenBurnsResult<Vec<u8>>;
}

/// [`FrameEncoder`] backed by the `image` crate.
#[derive(Clone, Debug)]
pub struct ImageCodec {
    format: ArtifactFormat,
    jpeg_quality: u8,
    background: Rgba8,
}

impl ImageCodec {
    pub const DEFAULT_JPEG_QUALITY: u8 = 75;

    pub fn new(format: ArtifactFormat) -> Self {
        Self {
            format,
            jpeg_quality: Self::DEFAULT_JPEG_QUALITY,
            background: Rgba8::BLACK,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> KenBurnsResult<Self> {
        if !(1..=100).contains(&quality) {
            return Err(KenBurnsError::configuration(format!(
                "jpeg quality must be in 1..=100, got {quality}"
            )));
        }
        self.jpeg_quality = quality;
        Ok(self)
    }

    /// Color that transparent pixels are flattened over for opaque codecs.
    pub fn with_background(mut self, background: Rgba8) -> Self {
        self.background = background;
        self
    }

    pub fn format(&self) -> ArtifactFormat {
        self.format
    }
}

impl FrameEncoder for ImageCodec {
    fn extension(&self) -> &str {
        self.format.extension()
    }

    fn encode(&self, frame: &FrameRGBA) -> KenBurnsResult<Vec<u8>> {
        let expected = (frame.width as usize)
            .saturating_mul(frame.height as usize)
            .saturating_mul(4);
        if frame.data.len() != expected {
            return Err(KenBurnsError::encode(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let mut out = Vec::new();
        match self.format {
            ArtifactFormat::Png => {
                let mut straight = frame.data.clone();
                if frame.premultiplied {
                    unpremultiply_rgba8_in_place(&mut straight);
                }
                image::codecs::png::PngEncoder::new(&mut out)
                    .write_image(
                        &straight,
                        frame.width,
                        frame.height,
                        image::ExtendedColorType::Rgba8,
                    )
                    .map_err(|e| KenBurnsError::encode(format!("png: {e}")))?;
            }
            ArtifactFormat::Jpeg => {
                let rgb = flatten_to_rgb8(&frame.data, frame.premultiplied, self.background);
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, self.jpeg_quality)
                    .write_image(&rgb, frame.width, frame.height, image::ExtendedColorType::Rgb8)
                    .map_err(|e| KenBurnsError::encode(format!("jpeg: {e}")))?;
            }
        }
        Ok(out)
    }
}

/// Composite RGBA8 over an opaque background and drop alpha.
fn flatten_to_rgb8(src: &[u8], src_is_premul: bool, bg: Rgba8) -> Vec<u8> {
    let bg = bg.to_array().map(u16::from);
    let mut out = Vec::with_capacity(src.len() / 4 * 3);

    for s in src.chunks_exact(4) {
        let a = u16::from(s[3]);
        if a == 255 {
            out.extend_from_slice(&s[..3]);
            continue;
        }
        let inv = 255u16 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            out.push((fg + mul_div255_u16(bg[c], inv)).min(255) as u8);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/encode/codec.rs"]
mod tests;
