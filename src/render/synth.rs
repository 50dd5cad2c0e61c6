use crate::foundation::core::{FrameIndex, FrameRGBA, Size};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::geometry::zoom::{CropRect, ZoomSchedule};
use crate::render::reference::ReferenceImage;
use crate::text::overlay::{ParleyRasterizer, TextOverlaySpec, TextRasterizer, apply_overlay};

/// Produces output frames from a shared reference image.
///
/// Holds only shared borrows, so one synthesizer can serve every worker thread; anything mutable
/// (the text rasterizer) is passed in per call.
#[derive(Clone, Copy, Debug)]
pub struct FrameSynthesizer<'a> {
    reference: &'a ReferenceImage,
    schedule: &'a ZoomSchedule,
    overlay: Option<&'a TextOverlaySpec>,
}

impl<'a> FrameSynthesizer<'a> {
    pub fn new(
        reference: &'a ReferenceImage,
        schedule: &'a ZoomSchedule,
        overlay: Option<&'a TextOverlaySpec>,
    ) -> KenBurnsResult<Self> {
        if reference.size() != schedule.reference() {
            return Err(KenBurnsError::configuration(format!(
                "reference image is {} but the schedule expects {}",
                reference.size(),
                schedule.reference()
            )));
        }
        if let Some(spec) = overlay {
            spec.validate()?;
        }
        Ok(Self {
            reference,
            schedule,
            overlay,
        })
    }

    pub fn schedule(&self) -> &ZoomSchedule {
        self.schedule
    }

    pub fn overlay(&self) -> Option<&TextOverlaySpec> {
        self.overlay
    }

    /// A fresh rasterizer for the configured overlay, one per worker.
    pub fn rasterizer(&self) -> KenBurnsResult<Option<ParleyRasterizer>> {
        self.overlay.map(ParleyRasterizer::new).transpose()
    }

    /// Render frame `idx`: crop, nearest-neighbor resample to the output size, then overlay.
    ///
    /// Without a `rasterizer`, an overlay (if configured) is painted with a one-off
    /// [`ParleyRasterizer`].
    pub fn synthesize(
        &self,
        idx: FrameIndex,
        rasterizer: Option<&mut dyn TextRasterizer>,
    ) -> KenBurnsResult<FrameRGBA> {
        let rect = self.schedule.crop_at(idx)?;
        tracing::debug!(frame = idx.0, ?rect, "synthesizing frame");

        let mut frame = resample_nearest(self.reference, rect, self.schedule.output())?;

        if let Some(spec) = self.overlay {
            match rasterizer {
                Some(r) => apply_overlay(&mut frame, spec, r)?,
                None => {
                    let mut r = ParleyRasterizer::new(spec)?;
                    apply_overlay(&mut frame, spec, &mut r)?;
                }
            }
        }
        Ok(frame)
    }
}

/// One-shot form of [`FrameSynthesizer::synthesize`].
pub fn synthesize_frame(
    reference: &ReferenceImage,
    idx: FrameIndex,
    schedule: &ZoomSchedule,
    overlay: Option<&TextOverlaySpec>,
) -> KenBurnsResult<FrameRGBA> {
    FrameSynthesizer::new(reference, schedule, overlay)?.synthesize(idx, None)
}

/// Nearest-neighbor resample of `rect` from `reference` into a new `out`-sized frame.
///
/// Destination pixel centers map to source pixels with integer arithmetic only, so the result
/// is identical on every platform.
pub fn resample_nearest(
    reference: &ReferenceImage,
    rect: CropRect,
    out: Size,
) -> KenBurnsResult<FrameRGBA> {
    if !rect.is_within(reference.size()) {
        return Err(KenBurnsError::configuration(format!(
            "crop {rect:?} is outside the {} reference",
            reference.size()
        )));
    }
    let len = out.rgba8_len()?;

    let src = reference.premul_pixels().as_raw();
    let src_stride = reference.width() as usize * 4;

    let x_map: Vec<usize> = (0..out.width)
        .map(|dx| (rect.x + nearest_src(dx, rect.width, out.width)) as usize * 4)
        .collect();

    let mut data = vec![0u8; len];
    for (dy, row) in data.chunks_exact_mut(out.width as usize * 4).enumerate() {
        let sy = (rect.y + nearest_src(dy as u32, rect.height, out.height)) as usize;
        let src_row = &src[sy * src_stride..(sy + 1) * src_stride];
        for (px, &sx) in row.chunks_exact_mut(4).zip(&x_map) {
            px.copy_from_slice(&src_row[sx..sx + 4]);
        }
    }

    FrameRGBA::from_raw(out, data, true)
}

fn nearest_src(d: u32, src_len: u32, dst_len: u32) -> u32 {
    let s = ((2 * u64::from(d) + 1) * u64::from(src_len)) / (2 * u64::from(dst_len));
    (s as u32).min(src_len - 1)
}

#[cfg(test)]
#[path = "../../tests/unit/render/synth.rs"]
mod tests;
