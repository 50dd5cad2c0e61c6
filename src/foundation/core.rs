use crate::foundation::error::{KenBurnsError, KenBurnsResult};

pub use vello_cpu::kurbo::Point;

/// Zero-based position of a frame within the zoom sequence.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    /// 1-based index used for artifact file names.
    pub fn artifact_number(self) -> u32 {
        self.0 + 1
    }
}

/// Pixel dimensions of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> KenBurnsResult<Self> {
        if width == 0 || height == 0 {
            return Err(KenBurnsError::configuration(format!(
                "size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Byte length of an RGBA8 buffer of this size.
    pub fn rgba8_len(self) -> KenBurnsResult<usize> {
        usize::try_from(self.area())
            .ok()
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| {
                KenBurnsError::configuration(format!(
                    "{}x{} rgba8 buffer does not fit in memory",
                    self.width, self.height
                ))
            })
    }

    pub fn contains(self, other: Size) -> bool {
        other.width <= self.width && other.height <= self.height
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_premul(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let premul = |c: u8| crate::foundation::math::mul_div255_u8(u16::from(c), a);
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A rendered frame in row-major RGBA8.
///
/// Pipeline frames are premultiplied; `premultiplied` is carried so encoders never guess.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn from_raw(size: Size, data: Vec<u8>, premultiplied: bool) -> KenBurnsResult<Self> {
        let expected = size.rgba8_len()?;
        if data.len() != expected {
            return Err(KenBurnsError::render(format!(
                "frame data is {} bytes, expected {expected} for {size}",
                data.len()
            )));
        }
        Ok(Self {
            width: size.width,
            height: size.height,
            data,
            premultiplied,
        })
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
