use std::path::PathBuf;
use std::time::Instant;

use crate::assets::decode::load_source;
use crate::config::settings::KenBurnsConfig;
use crate::encode::codec::{ArtifactFormat, FrameEncoder as _};
use crate::encode::ffmpeg::VideoAssembler;
use crate::foundation::core::{FrameIndex, Size};
use crate::foundation::error::KenBurnsResult;
use crate::geometry::zoom::{CropRect, ZoomSchedule};
use crate::output::artifacts::{ArtifactNaming, RunDirectory};
use crate::output::materialize::{build_thread_pool, render_and_materialize};
use crate::render::reference::build_reference;
use crate::render::synth::FrameSynthesizer;

/// Wall time spent in each stage of a run, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct StageTimings {
    pub decode_ms: u64,
    pub reference_ms: u64,
    pub materialize_ms: u64,
    pub avg_frame_ms: u64,
    pub assemble_ms: Option<u64>,
}

/// Outcome of [`run`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunSummary {
    pub reference: Size,
    pub format: ArtifactFormat,
    pub artifact_count: usize,
    /// Where the frames were left; `None` once cleaned up.
    pub artifact_dir: Option<PathBuf>,
    pub video: Option<PathBuf>,
    pub timings: StageTimings,
}

/// Geometry of a run, computed without touching pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunPlan {
    pub schedule: ZoomSchedule,
    pub first_crop: CropRect,
    pub last_crop: CropRect,
    pub artifact_prefix: String,
    pub work_dir: PathBuf,
}

/// Validate `cfg` and describe the zoom it would render.
pub fn plan(cfg: &KenBurnsConfig) -> KenBurnsResult<RunPlan> {
    let schedule = cfg.validate()?;
    Ok(RunPlan {
        first_crop: schedule.crop_at(FrameIndex(0))?,
        last_crop: schedule.crop_at(FrameIndex(schedule.frame_count() - 1))?,
        schedule,
        artifact_prefix: cfg.artifact_naming_prefix()?,
        work_dir: cfg.resolved_work_dir(),
    })
}

/// Run the whole zoom: decode, build the reference, materialize every frame, then hand the
/// artifacts to `assembler` when assembly is configured.
///
/// A failed materialization leaves nothing behind. A failed assembly keeps the frames on disk.
#[tracing::instrument(skip_all, fields(input = %cfg.input.display()))]
pub fn run(cfg: &KenBurnsConfig, assembler: &dyn VideoAssembler) -> KenBurnsResult<RunSummary> {
    let schedule = cfg.validate()?;
    let assembly = cfg.resolved_assembly()?;
    let mut timings = StageTimings::default();

    let t0 = Instant::now();
    let source = load_source(&cfg.input)?;
    timings.decode_ms = t0.elapsed().as_millis() as u64;
    tracing::info!(
        size = %source.size(),
        format = ?source.format(),
        elapsed_ms = timings.decode_ms,
        "decoded source"
    );

    let format = cfg.resolved_format(source.format());
    let codec = cfg.codec(format)?;
    let overlay = cfg.overlay_spec()?;

    let t0 = Instant::now();
    let reference = build_reference(&source, schedule.reference())?;
    drop(source);
    timings.reference_ms = t0.elapsed().as_millis() as u64;

    let synth = FrameSynthesizer::new(&reference, &schedule, overlay.as_ref())?;
    let prefix = cfg.artifact_naming_prefix()?;
    let naming = ArtifactNaming::new(&prefix, codec.extension(), schedule.frame_count())?;
    let pool = build_thread_pool(cfg.threads)?;
    let run_dir = RunDirectory::create(&cfg.resolved_work_dir(), &prefix)?;
    tracing::info!(dir = %run_dir.path().display(), "created run directory");

    let t0 = Instant::now();
    let artifacts = render_and_materialize(&synth, run_dir.path(), &naming, &codec, &pool)?;
    timings.materialize_ms = t0.elapsed().as_millis() as u64;
    timings.avg_frame_ms = timings.materialize_ms / u64::from(schedule.frame_count());
    tracing::info!(
        frames = artifacts.len(),
        avg_frame_ms = timings.avg_frame_ms,
        "frames written"
    );

    let mut summary = RunSummary {
        reference: reference.size(),
        format,
        artifact_count: artifacts.len(),
        artifact_dir: None,
        video: None,
        timings,
    };

    let Some(assembly) = assembly else {
        summary.artifact_dir = Some(run_dir.persist());
        return Ok(summary);
    };

    let t0 = Instant::now();
    if let Err(e) = assembler.assemble(&artifacts, &assembly) {
        let kept = run_dir.persist();
        tracing::error!(dir = %kept.display(), error = %e, "video assembly failed; frames kept");
        return Err(e);
    }
    summary.timings.assemble_ms = Some(t0.elapsed().as_millis() as u64);
    summary.video = Some(assembly.output);

    if cfg.cleanup {
        run_dir.remove()?;
    } else {
        summary.artifact_dir = Some(run_dir.persist());
    }
    Ok(summary)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
