use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::core::{FrameRGBA, Point, Rgba8};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::foundation::math::over_premul_in_place;

/// Fixed text painted identically onto every frame.
#[derive(Clone)]
pub struct TextOverlaySpec {
    pub lines: Vec<String>,
    pub font_bytes: Arc<Vec<u8>>,
    pub font_size: f32,
    pub line_spacing: f32,
    pub color: Rgba8,
    /// Top-left of the first line, in output-frame pixels.
    pub origin: Point,
}

impl std::fmt::Debug for TextOverlaySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextOverlaySpec")
            .field("lines", &self.lines)
            .field("font_bytes_len", &self.font_bytes.len())
            .field("font_size", &self.font_size)
            .field("line_spacing", &self.line_spacing)
            .field("color", &self.color)
            .field("origin", &self.origin)
            .finish()
    }
}

impl TextOverlaySpec {
    pub fn validate(&self) -> KenBurnsResult<()> {
        if self.font_bytes.is_empty() {
            return Err(KenBurnsError::configuration("overlay font data is empty"));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(KenBurnsError::configuration(
                "overlay font size must be finite and > 0",
            ));
        }
        if !self.line_spacing.is_finite() || self.line_spacing <= 0.0 {
            return Err(KenBurnsError::configuration(
                "overlay line spacing must be finite and > 0",
            ));
        }
        if !self.origin.x.is_finite() || !self.origin.y.is_finite() {
            return Err(KenBurnsError::configuration("overlay origin must be finite"));
        }
        Ok(())
    }

    /// Vertical distance between consecutive line origins.
    pub fn line_advance(&self) -> f64 {
        f64::from(self.font_size) * f64::from(self.line_spacing)
    }
}

/// Text engine contract: paint one line into `dst` at `origin`.
///
/// Returns the pen position after the line.
pub trait TextRasterizer {
    fn draw_line(&mut self, dst: &mut FrameRGBA, origin: Point, text: &str) -> KenBurnsResult<Point>;
}

/// Paint every overlay line onto `frame`, one line advance apart.
///
/// Any line failing aborts the whole overlay.
pub fn apply_overlay(
    frame: &mut FrameRGBA,
    spec: &TextOverlaySpec,
    rasterizer: &mut dyn TextRasterizer,
) -> KenBurnsResult<()> {
    let mut cursor = spec.origin;
    for (i, line) in spec.lines.iter().enumerate() {
        rasterizer
            .draw_line(frame, cursor, line)
            .map_err(|e| match e {
                KenBurnsError::Render(msg) => {
                    KenBurnsError::render(format!("overlay line {i}: {msg}"))
                }
                other => KenBurnsError::render(format!("overlay line {i}: {other}")),
            })?;
        cursor.y += spec.line_advance();
    }
    Ok(())
}

/// [`TextRasterizer`] shaping with Parley and rasterizing glyph runs with `vello_cpu`.
///
/// Holds mutable shaping and raster contexts, so each worker thread owns its own instance.
pub struct ParleyRasterizer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
    font_size: f32,
    color: Rgba8,
    layouts: HashMap<String, parley::Layout<Rgba8>>,
    ctx: Option<vello_cpu::RenderContext>,
    scratch: Option<vello_cpu::Pixmap>,
}

impl ParleyRasterizer {
    pub fn new(spec: &TextOverlaySpec) -> KenBurnsResult<Self> {
        spec.validate()?;

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(spec.font_bytes.as_ref().clone()),
            None,
        );
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| KenBurnsError::render("no font families registered from font bytes"))?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| KenBurnsError::render("registered font family has no name"))?
            .to_string();

        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(spec.font_bytes.as_ref().clone()),
            0,
        );

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font,
            font_size: spec.font_size,
            color: spec.color,
            layouts: HashMap::new(),
            ctx: None,
            scratch: None,
        })
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    fn layout_for(&mut self, text: &str) -> &parley::Layout<Rgba8> {
        if !self.layouts.contains_key(text) {
            let mut builder = self
                .layout_ctx
                .ranged_builder(&mut self.font_ctx, text, 1.0, true);
            builder.push_default(parley::style::StyleProperty::FontStack(
                parley::style::FontStack::Source(std::borrow::Cow::Owned(
                    self.family_name.clone(),
                )),
            ));
            builder.push_default(parley::style::StyleProperty::FontSize(self.font_size));
            builder.push_default(parley::style::StyleProperty::Brush(self.color));

            let mut layout: parley::Layout<Rgba8> = builder.build(text);
            layout.break_all_lines(None);
            self.layouts.insert(text.to_owned(), layout);
        }
        &self.layouts[text]
    }
}

impl TextRasterizer for ParleyRasterizer {
    fn draw_line(&mut self, dst: &mut FrameRGBA, origin: Point, text: &str) -> KenBurnsResult<Point> {
        if !dst.premultiplied {
            return Err(KenBurnsError::render(
                "text overlay expects a premultiplied frame",
            ));
        }
        let w: u16 = dst
            .width
            .try_into()
            .map_err(|_| KenBurnsError::render("frame width exceeds rasterizer limit (u16)"))?;
        let h: u16 = dst
            .height
            .try_into()
            .map_err(|_| KenBurnsError::render("frame height exceeds rasterizer limit (u16)"))?;
        if text.is_empty() {
            return Ok(origin);
        }

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        let mut pixmap = match self.scratch.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        pixmap.data_as_u8_slice_mut().fill(0);
        ctx.reset();
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((origin.x, origin.y)));

        let font = self.font.clone();
        let layout = self.layout_for(text);
        let advance = f64::from(layout.width());
        let mut glyph_count = 0usize;
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs: Vec<vello_cpu::Glyph> = run
                    .glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                glyph_count += glyphs.len();
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs.into_iter());
            }
        }
        if glyph_count == 0 {
            self.ctx = Some(ctx);
            self.scratch = Some(pixmap);
            return Err(KenBurnsError::render(format!(
                "no glyphs shaped for {text:?} with font '{}'",
                self.family_name
            )));
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        over_premul_in_place(&mut dst.data, pixmap.data_as_u8_slice());

        self.ctx = Some(ctx);
        self.scratch = Some(pixmap);
        Ok(Point::new(origin.x + advance, origin.y))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/overlay.rs"]
mod tests;
