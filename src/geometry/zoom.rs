//! Zoom geometry: reference sizing, per-frame zoom factors and centered crop rectangles.
//!
//! Everything here is pure and allocation-free, so it can be queried from any number of worker
//! threads without synchronization.

use crate::foundation::core::{FrameIndex, Size};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::foundation::math::exact_powi;

/// Direction of the simulated camera move.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    /// The crop shrinks frame after frame (push in).
    #[default]
    In,
    /// The crop grows frame after frame, ending on the full reference (pull out).
    Out,
}

/// Region of the reference image sampled for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn size(self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn area(self) -> u64 {
        self.size().area()
    }

    /// `true` when the rectangle lies fully inside `[0, bounds.width) x [0, bounds.height)`.
    pub fn is_within(self, bounds: Size) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(bounds.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(bounds.height)
    }
}

/// `floor(target_dim * (1 + per_frame_factor)^frame_count)`.
pub fn reference_dim(target_dim: u32, per_frame_factor: f64, frame_count: u32) -> KenBurnsResult<u32> {
    if !per_frame_factor.is_finite() || per_frame_factor <= -1.0 {
        return Err(KenBurnsError::configuration(format!(
            "per-frame zoom factor must be finite and > -1, got {per_frame_factor}"
        )));
    }
    if target_dim == 0 {
        return Err(KenBurnsError::configuration("target dimension must be non-zero"));
    }

    let growth = exact_powi(1.0 + per_frame_factor, frame_count);
    let dim = (f64::from(target_dim) * growth).floor();
    if !dim.is_finite() || dim > f64::from(u32::MAX) {
        return Err(KenBurnsError::configuration(format!(
            "reference dimension overflows: {target_dim} * (1 + {per_frame_factor})^{frame_count}"
        )));
    }
    if dim < 1.0 {
        return Err(KenBurnsError::configuration(format!(
            "reference dimension collapses to zero: {target_dim} * (1 + {per_frame_factor})^{frame_count}"
        )));
    }
    Ok(dim as u32)
}

/// Reference image size for a target output size.
pub fn reference_size(target: Size, per_frame_factor: f64, frame_count: u32) -> KenBurnsResult<Size> {
    Ok(Size {
        width: reference_dim(target.width, per_frame_factor, frame_count)?,
        height: reference_dim(target.height, per_frame_factor, frame_count)?,
    })
}

/// Fraction of the reference visible at frame `i` of a zoom-in: `(1 - per_frame_factor)^i`.
pub fn zoom_factor_at(i: u32, per_frame_factor: f64) -> KenBurnsResult<f64> {
    if !per_frame_factor.is_finite() || !(0.0..1.0).contains(&per_frame_factor) {
        return Err(KenBurnsError::configuration(format!(
            "per-frame zoom factor must be in [0, 1), got {per_frame_factor}"
        )));
    }
    Ok(exact_powi(1.0 - per_frame_factor, i))
}

/// Centered crop of `reference` scaled by `factor`.
///
/// Width and height are truncated first and the offsets derived from the truncated size, so
/// `offset + size` can never exceed the reference.
pub fn crop_rect_for(factor: f64, reference: Size) -> KenBurnsResult<CropRect> {
    if !factor.is_finite() || factor <= 0.0 || factor > 1.0 {
        return Err(KenBurnsError::configuration(format!(
            "zoom factor must be in (0, 1], got {factor}"
        )));
    }

    let width = (f64::from(reference.width) * factor) as u32;
    let height = (f64::from(reference.height) * factor) as u32;
    if width == 0 || height == 0 {
        return Err(KenBurnsError::configuration(format!(
            "zoom factor {factor} leaves an empty crop of the {reference} reference"
        )));
    }

    let rect = CropRect {
        x: (reference.width - width) / 2,
        y: (reference.height - height) / 2,
        width,
        height,
    };
    debug_assert!(rect.is_within(reference));
    Ok(rect)
}

/// A validated zoom schedule: output size, reference size and per-frame crops.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ZoomSchedule {
    output: Size,
    reference: Size,
    per_frame_factor: f64,
    frame_count: u32,
    direction: ZoomDirection,
}

impl ZoomSchedule {
    /// Build a schedule and check it end to end before any pixel work.
    ///
    /// Both extremes of the schedule are simulated: each crop must stay inside the reference and
    /// must not be smaller than `output`, otherwise frames would be upsampled from the reference.
    pub fn new(
        output: Size,
        per_frame_factor: f64,
        frame_count: u32,
        direction: ZoomDirection,
    ) -> KenBurnsResult<Self> {
        if output.width == 0 || output.height == 0 {
            return Err(KenBurnsError::configuration(format!(
                "output size must be non-zero, got {output}"
            )));
        }
        if frame_count == 0 {
            return Err(KenBurnsError::configuration("frame count must be >= 1"));
        }
        if !per_frame_factor.is_finite() || per_frame_factor <= 0.0 || per_frame_factor >= 1.0 {
            return Err(KenBurnsError::configuration(format!(
                "per-frame zoom factor must be in (0, 1), got {per_frame_factor}"
            )));
        }

        let reference = reference_size(output, per_frame_factor, frame_count)?;
        let schedule = Self {
            output,
            reference,
            per_frame_factor,
            frame_count,
            direction,
        };

        for idx in [FrameIndex(0), FrameIndex(frame_count - 1)] {
            let rect = schedule.crop_at(idx)?;
            if !rect.is_within(reference) {
                return Err(KenBurnsError::configuration(format!(
                    "frame {} crop {rect:?} escapes the {reference} reference",
                    idx.0
                )));
            }
            if !rect.size().contains(output) {
                return Err(KenBurnsError::configuration(format!(
                    "frame {} crop {}x{} is smaller than the {output} output; \
                     lower the zoom factor or the frame count",
                    idx.0, rect.width, rect.height
                )));
            }
        }

        Ok(schedule)
    }

    pub fn output(&self) -> Size {
        self.output
    }

    pub fn reference(&self) -> Size {
        self.reference
    }

    pub fn per_frame_factor(&self) -> f64 {
        self.per_frame_factor
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn direction(&self) -> ZoomDirection {
        self.direction
    }

    /// Zoom factor for `idx`; a zoom-out plays the zoom-in exponents backwards.
    pub fn factor_at(&self, idx: FrameIndex) -> KenBurnsResult<f64> {
        if idx.0 >= self.frame_count {
            return Err(KenBurnsError::configuration(format!(
                "frame {} is outside the {}-frame schedule",
                idx.0, self.frame_count
            )));
        }
        let exp = match self.direction {
            ZoomDirection::In => idx.0,
            ZoomDirection::Out => self.frame_count - 1 - idx.0,
        };
        zoom_factor_at(exp, self.per_frame_factor)
    }

    pub fn crop_at(&self, idx: FrameIndex) -> KenBurnsResult<CropRect> {
        crop_rect_for(self.factor_at(idx)?, self.reference)
    }

    /// Every frame's crop, in frame order.
    pub fn crops(&self) -> impl Iterator<Item = KenBurnsResult<(FrameIndex, CropRect)>> + '_ {
        (0..self.frame_count).map(|i| {
            let idx = FrameIndex(i);
            self.crop_at(idx).map(|rect| (idx, rect))
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/zoom.rs"]
mod tests;
