//! Ken Burns zoom synthesis: turn one still image into a numbered frame sequence that slowly
//! zooms toward (or away from) its center, and optionally into an MP4.
//!
//! # Pipeline overview
//!
//! 1. **Plan**: `KenBurnsConfig -> ZoomSchedule` (reference size and every crop, validated up front)
//! 2. **Reference**: decode the source once and resample it to the reference size (Catmull-Rom)
//! 3. **Synthesize**: per frame, crop the reference and nearest-neighbor resample to the output
//!    size, then paint the optional text overlay
//! 4. **Materialize**: encode and write every frame concurrently on a `rayon` pool
//! 5. **Assemble** (optional): hand the image sequence to the system `ffmpeg` binary
//!
//! Frames are premultiplied RGBA8 end-to-end; `unsafe` is forbidden in this crate.
#![forbid(unsafe_code)]

mod assets;
mod config;
mod encode;
mod foundation;
mod geometry;
mod output;
mod render;
mod text;

pub use assets::decode::{SourceImage, decode_image, load_source};
pub use config::settings::{AssemblyConfig, KenBurnsConfig, MAX_OVERLAY_DIM, OverlayConfig};
pub use encode::codec::{ArtifactFormat, FrameEncoder, ImageCodec};
pub use encode::ffmpeg::{FfmpegAssembler, VideoAssembler, ensure_parent_dir, is_ffmpeg_on_path};
pub use foundation::core::{FrameIndex, FrameRGBA, Point, Rgba8, Size};
pub use foundation::error::{KenBurnsError, KenBurnsResult};
pub use foundation::math::exact_powi;
pub use geometry::zoom::{
    CropRect, ZoomDirection, ZoomSchedule, crop_rect_for, reference_dim, reference_size,
    zoom_factor_at,
};
pub use output::artifacts::{ArtifactNaming, ArtifactSet, MIN_INDEX_WIDTH, RunDirectory};
pub use output::materialize::{
    build_thread_pool, materialize_all, materialize_all_collecting, render_and_materialize,
    render_and_materialize_collecting,
};
pub use render::pipeline::{RunPlan, RunSummary, StageTimings, plan, run};
pub use render::reference::{ReferenceImage, build_reference};
pub use render::synth::{FrameSynthesizer, resample_nearest, synthesize_frame};
pub use text::overlay::{ParleyRasterizer, TextOverlaySpec, TextRasterizer, apply_overlay};
