use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::encode::codec::{ArtifactFormat, ImageCodec};
use crate::foundation::core::{Point, Rgba8, Size};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::geometry::zoom::{ZoomDirection, ZoomSchedule};
use crate::text::overlay::TextOverlaySpec;

/// Largest frame edge the text rasterizer can address.
pub const MAX_OVERLAY_DIM: u32 = u16::MAX as u32;

/// Complete description of one zoom run.
///
/// Built once (from JSON, CLI flags or code), validated, then only read.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KenBurnsConfig {
    /// Source image.
    pub input: PathBuf,

    /// Parent of the run directory. Defaults to the input's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,

    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,

    /// Per-frame zoom factor `f`.
    #[serde(default = "default_zoom_factor")]
    pub zoom_factor: f64,

    #[serde(default)]
    pub direction: ZoomDirection,

    /// Artifact file prefix. Defaults to `<input stem>-scaled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_prefix: Option<String>,

    /// Artifact codec. Defaults to the input's codec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ArtifactFormat>,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Straight color that transparent pixels are flattened over for opaque codecs.
    #[serde(default = "default_background")]
    pub background: Rgba8,

    /// Worker threads; all cores when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Upper bound on `reference.width * reference.height`.
    #[serde(default = "default_max_reference_pixels")]
    pub max_reference_pixels: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<OverlayConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assemble: Option<AssemblyConfig>,

    /// Delete the run directory once the video has been assembled.
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_frame_count() -> u32 {
    120
}

fn default_zoom_factor() -> f64 {
    0.005
}

fn default_jpeg_quality() -> u8 {
    ImageCodec::DEFAULT_JPEG_QUALITY
}

fn default_background() -> Rgba8 {
    Rgba8::BLACK
}

fn default_max_reference_pixels() -> u64 {
    // 400 MiB of RGBA8.
    100 * 1024 * 1024
}

fn default_cleanup() -> bool {
    true
}

impl KenBurnsConfig {
    /// Defaults for everything except the input path.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            work_dir: None,
            width: default_width(),
            height: default_height(),
            frame_count: default_frame_count(),
            zoom_factor: default_zoom_factor(),
            direction: ZoomDirection::default(),
            artifact_prefix: None,
            format: None,
            jpeg_quality: default_jpeg_quality(),
            background: default_background(),
            threads: None,
            max_reference_pixels: default_max_reference_pixels(),
            overlay: None,
            assemble: None,
            cleanup: default_cleanup(),
        }
    }

    pub fn from_json_str(s: &str) -> KenBurnsResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| KenBurnsError::configuration(format!("invalid run config: {e}")))
    }

    /// Load a JSON config. A relative `input` is resolved against the file's directory.
    pub fn from_json_file(path: &Path) -> KenBurnsResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read run config '{}'", path.display()))?;
        let mut cfg = Self::from_json_str(&s)?;
        if let Some(base) = path.parent() {
            cfg.input = base.join(&cfg.input);
            if let Some(dir) = cfg.work_dir.as_mut() {
                *dir = base.join(&*dir);
            }
        }
        Ok(cfg)
    }

    pub fn output_size(&self) -> KenBurnsResult<Size> {
        Size::new(self.width, self.height)
    }

    /// Check every parameter and return the zoom schedule the run will follow.
    pub fn validate(&self) -> KenBurnsResult<ZoomSchedule> {
        if self.input.as_os_str().is_empty() {
            return Err(KenBurnsError::configuration("input path must be set"));
        }
        let output = self.output_size()?;
        let schedule =
            ZoomSchedule::new(output, self.zoom_factor, self.frame_count, self.direction)?;

        let reference = schedule.reference();
        if reference.area() > self.max_reference_pixels {
            return Err(KenBurnsError::configuration(format!(
                "reference image {reference} exceeds max_reference_pixels ({})",
                self.max_reference_pixels
            )));
        }
        reference.rgba8_len()?;

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(KenBurnsError::configuration(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.threads == Some(0) {
            return Err(KenBurnsError::configuration(
                "threads must be >= 1 when set",
            ));
        }
        self.artifact_naming_prefix()?;

        if let Some(overlay) = &self.overlay {
            overlay.validate(output)?;
        }
        if let Some(assemble) = &self.assemble {
            assemble.validate()?;
            if !output.width.is_multiple_of(2) || !output.height.is_multiple_of(2) {
                return Err(KenBurnsError::configuration(
                    "width/height must be even (required for yuv420p video output)",
                ));
            }
        }
        Ok(schedule)
    }

    /// Directory the run directory is created in.
    pub fn resolved_work_dir(&self) -> PathBuf {
        match &self.work_dir {
            Some(dir) => dir.clone(),
            None => parent_or_current(&self.input),
        }
    }

    /// Artifact prefix, derived from the input stem when unset.
    pub fn artifact_naming_prefix(&self) -> KenBurnsResult<String> {
        if let Some(prefix) = &self.artifact_prefix {
            return Ok(prefix.clone());
        }
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                KenBurnsError::configuration(format!(
                    "cannot derive an artifact prefix from '{}'",
                    self.input.display()
                ))
            })?;
        Ok(format!("{stem}-scaled"))
    }

    /// Artifact codec: the configured one, else the input's, else PNG.
    pub fn resolved_format(&self, input_format: Option<image::ImageFormat>) -> ArtifactFormat {
        self.format
            .or_else(|| input_format.and_then(ArtifactFormat::from_image_format))
            .unwrap_or(ArtifactFormat::Png)
    }

    pub fn codec(&self, format: ArtifactFormat) -> KenBurnsResult<ImageCodec> {
        Ok(ImageCodec::new(format)
            .with_jpeg_quality(self.jpeg_quality)?
            .with_background(self.background))
    }

    /// Assembly settings with the output path defaulted to `<input dir>/<prefix>.mp4`.
    pub fn resolved_assembly(&self) -> KenBurnsResult<Option<AssemblyConfig>> {
        let Some(assemble) = &self.assemble else {
            return Ok(None);
        };
        let mut assemble = assemble.clone();
        if assemble.output.as_os_str().is_empty() {
            assemble.output = parent_or_current(&self.input)
                .join(format!("{}.mp4", self.artifact_naming_prefix()?));
        }
        Ok(Some(assemble))
    }

    /// Load the overlay font and place the overlay in output pixels.
    pub fn overlay_spec(&self) -> KenBurnsResult<Option<TextOverlaySpec>> {
        let Some(overlay) = &self.overlay else {
            return Ok(None);
        };
        let output = self.output_size()?;
        overlay.to_spec(output).map(Some)
    }
}

fn parent_or_current(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Fixed text drawn over every frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayConfig {
    pub lines: Vec<String>,
    /// TrueType/OpenType font file.
    pub font: PathBuf,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Line advance as a multiple of `font_size`.
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "default_text_color")]
    pub color: Rgba8,
    /// Top-left of the first line as fractions of the output frame.
    #[serde(default = "default_origin")]
    pub origin: [f64; 2],
}

fn default_font_size() -> f32 {
    48.0
}

fn default_line_spacing() -> f32 {
    1.2
}

fn default_text_color() -> Rgba8 {
    Rgba8::WHITE
}

fn default_origin() -> [f64; 2] {
    [0.05, 0.05]
}

impl OverlayConfig {
    pub fn new(lines: Vec<String>, font: impl Into<PathBuf>) -> Self {
        Self {
            lines,
            font: font.into(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            color: default_text_color(),
            origin: default_origin(),
        }
    }

    pub fn validate(&self, output: Size) -> KenBurnsResult<()> {
        if self.font.as_os_str().is_empty() {
            return Err(KenBurnsError::configuration("overlay font path must be set"));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(KenBurnsError::configuration(
                "overlay font_size must be finite and > 0",
            ));
        }
        if !self.line_spacing.is_finite() || self.line_spacing <= 0.0 {
            return Err(KenBurnsError::configuration(
                "overlay line_spacing must be finite and > 0",
            ));
        }
        if self
            .origin
            .iter()
            .any(|v| !v.is_finite() || !(0.0..=1.0).contains(v))
        {
            return Err(KenBurnsError::configuration(format!(
                "overlay origin fractions must be in [0, 1], got {:?}",
                self.origin
            )));
        }
        if output.width > MAX_OVERLAY_DIM || output.height > MAX_OVERLAY_DIM {
            return Err(KenBurnsError::configuration(format!(
                "text overlay supports frames up to {MAX_OVERLAY_DIM}px per side, got {output}"
            )));
        }
        Ok(())
    }

    /// Read the font and resolve the origin against `output`.
    pub fn to_spec(&self, output: Size) -> KenBurnsResult<TextOverlaySpec> {
        self.validate(output)?;
        let font_bytes = std::fs::read(&self.font)
            .with_context(|| format!("read overlay font '{}'", self.font.display()))?;
        let spec = TextOverlaySpec {
            lines: self.lines.clone(),
            font_bytes: Arc::new(font_bytes),
            font_size: self.font_size,
            line_spacing: self.line_spacing,
            color: self.color,
            origin: Point::new(
                self.origin[0] * f64::from(output.width),
                self.origin[1] * f64::from(output.height),
            ),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Video assembly settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyConfig {
    /// Output video. Defaults to `<input dir>/<prefix>.mp4` when empty.
    #[serde(default)]
    pub output: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_fps() -> u32 {
    30
}

fn default_overwrite() -> bool {
    true
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::new(),
            fps: default_fps(),
            overwrite: default_overwrite(),
        }
    }
}

impl AssemblyConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> KenBurnsResult<()> {
        if self.fps == 0 {
            return Err(KenBurnsError::configuration("assembly fps must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
