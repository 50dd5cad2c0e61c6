use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::encode::codec::FrameEncoder;
use crate::foundation::core::{FrameIndex, FrameRGBA};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::output::artifacts::{ArtifactNaming, ArtifactSet};
use crate::render::synth::FrameSynthesizer;
use crate::text::overlay::TextRasterizer;

/// Build the worker pool used for synthesis and materialization.
pub fn build_thread_pool(threads: Option<usize>) -> KenBurnsResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(KenBurnsError::configuration(
            "worker 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("kenburns-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        KenBurnsError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
    })
}

/// Encode and write already synthesized `frames` (frame `i` becomes artifact `i + 1`).
///
/// All writes run concurrently; the call returns once every task has finished. On failure no
/// artifact of the batch is left behind and the lowest-numbered failure is returned.
pub fn materialize_all(
    frames: &[FrameRGBA],
    dir: &Path,
    naming: &ArtifactNaming,
    encoder: &dyn FrameEncoder,
    pool: &rayon::ThreadPool,
) -> KenBurnsResult<ArtifactSet> {
    materialize_all_collecting(frames, dir, naming, encoder, pool).map_err(first_failure)
}

/// Like [`materialize_all`] but returns every failure, ordered by frame.
pub fn materialize_all_collecting(
    frames: &[FrameRGBA],
    dir: &Path,
    naming: &ArtifactNaming,
    encoder: &dyn FrameEncoder,
    pool: &rayon::ThreadPool,
) -> Result<ArtifactSet, Vec<KenBurnsError>> {
    let count = u32::try_from(frames.len()).map_err(|_| {
        vec![KenBurnsError::configuration(
            "frame batch exceeds u32::MAX frames",
        )]
    })?;
    run_batch(count, dir, naming, encoder, pool, || (), |_, idx| {
        Ok(Cow::Borrowed(&frames[idx.0 as usize]))
    })
}

/// Synthesize, encode and write every frame of `synth`'s schedule, one task per frame.
///
/// Each worker thread owns its own text rasterizer; frames are dropped as soon as they are
/// written, so at most one frame per worker is resident.
pub fn render_and_materialize(
    synth: &FrameSynthesizer<'_>,
    dir: &Path,
    naming: &ArtifactNaming,
    encoder: &dyn FrameEncoder,
    pool: &rayon::ThreadPool,
) -> KenBurnsResult<ArtifactSet> {
    render_and_materialize_collecting(synth, dir, naming, encoder, pool).map_err(first_failure)
}

/// Like [`render_and_materialize`] but returns every failure, ordered by frame.
pub fn render_and_materialize_collecting(
    synth: &FrameSynthesizer<'_>,
    dir: &Path,
    naming: &ArtifactNaming,
    encoder: &dyn FrameEncoder,
    pool: &rayon::ThreadPool,
) -> Result<ArtifactSet, Vec<KenBurnsError>> {
    run_batch(
        synth.schedule().frame_count(),
        dir,
        naming,
        encoder,
        pool,
        || synth.rasterizer().map_err(|e| e.to_string()),
        |worker, idx| {
            let rasterizer = match worker {
                Ok(Some(r)) => Some(r as &mut dyn TextRasterizer),
                Ok(None) => None,
                Err(msg) => return Err(KenBurnsError::render(msg.clone())),
            };
            synth
                .synthesize(idx, rasterizer)
                .map(Cow::Owned)
                .map_err(|e| at_frame(idx, e))
        },
    )
}

fn run_batch<'f, W, I, P>(
    count: u32,
    dir: &Path,
    naming: &ArtifactNaming,
    encoder: &dyn FrameEncoder,
    pool: &rayon::ThreadPool,
    init: I,
    produce: P,
) -> Result<ArtifactSet, Vec<KenBurnsError>>
where
    I: Fn() -> W + Sync + Send,
    P: Fn(&mut W, FrameIndex) -> KenBurnsResult<Cow<'f, FrameRGBA>> + Sync + Send,
{
    if !dir.is_dir() {
        return Err(vec![KenBurnsError::configuration(format!(
            "artifact directory '{}' does not exist",
            dir.display()
        ))]);
    }

    let started = std::time::Instant::now();
    let results: Vec<KenBurnsResult<PathBuf>> = pool.install(|| {
        (0..count)
            .into_par_iter()
            .map_init(init, |worker, i| {
                let idx = FrameIndex(i);
                let frame = produce(worker, idx)?;
                let path = dir.join(naming.file_name(idx));
                let bytes = encoder.encode(&frame).map_err(|e| {
                    KenBurnsError::materialization(idx.artifact_number(), &path, e)
                })?;
                drop(frame);
                write_artifact(&path, &bytes).map_err(|e| {
                    KenBurnsError::materialization(idx.artifact_number(), &path, e.into())
                })?;
                Ok(path)
            })
            .collect()
    });

    let mut paths = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for r in results {
        match r {
            Ok(p) => paths.push(p),
            Err(e) => failures.push(e),
        }
    }

    if !failures.is_empty() {
        for e in &failures {
            tracing::warn!(error = %e, "frame task failed");
        }
        for p in &paths {
            if let Err(e) = std::fs::remove_file(p) {
                tracing::warn!(path = %p.display(), error = %e, "failed to remove partial artifact");
            }
        }
        tracing::error!(
            failed = failures.len(),
            total = count,
            "materialization aborted; partial artifacts removed"
        );
        return Err(failures);
    }

    let elapsed = started.elapsed();
    tracing::info!(
        frames = count,
        elapsed_ms = elapsed.as_millis() as u64,
        avg_ms_per_frame = elapsed.as_millis() as u64 / u64::from(count.max(1)),
        "materialized frames"
    );
    Ok(ArtifactSet::new(dir.to_path_buf(), naming.clone(), paths))
}

/// Write `bytes` to a new file at `path`, flushed to disk before returning.
fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file = std::fs::File::create_new(path)?;
    fill_artifact(path, file, bytes, |f| f.sync_all())
}

/// Fill the file just created at `path`; on any write or sync failure the truncated file is
/// removed again.
fn fill_artifact<W: Write>(
    path: &Path,
    mut out: W,
    bytes: &[u8],
    sync: impl FnOnce(&mut W) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let result = out.write_all(bytes).and_then(|()| sync(&mut out));
    if result.is_err() {
        drop(out);
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove truncated artifact");
        }
    }
    result
}

fn at_frame(idx: FrameIndex, e: KenBurnsError) -> KenBurnsError {
    match e {
        KenBurnsError::Render(msg) => {
            KenBurnsError::render(format!("frame {}: {msg}", idx.artifact_number()))
        }
        other => other,
    }
}

fn first_failure(mut failures: Vec<KenBurnsError>) -> KenBurnsError {
    if failures.is_empty() {
        return KenBurnsError::Other(anyhow::anyhow!("batch failed without an error"));
    }
    failures.swap_remove(0)
}

#[cfg(test)]
#[path = "../../tests/unit/output/materialize.rs"]
mod tests;
